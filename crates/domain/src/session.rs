use std::collections::BTreeSet;

use capacita_core::{AppError, AppResult, NonEmptyString};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    LifecycleError, ParticipantId, ParticipantMutationError, Roster, SessionState, TransitionKind,
};

/// Unique identifier for a training session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a new random session identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a session identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Kind of training activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrainingType {
    /// Multi-hour course.
    Course,
    /// Hands-on workshop.
    Workshop,
    /// Short talk.
    Talk,
    /// Anything else.
    Other,
}

/// Whether the session is delivered in-house.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    /// Delivered by company staff.
    Internal,
    /// Delivered by an external provider.
    External,
}

/// Container a session was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OriginKind {
    /// Yearly training plan.
    Plan,
    /// Training program.
    Program,
}

/// Plan or program the session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingOrigin {
    /// Plan or program.
    pub kind: OriginKind,
    /// Display name of the plan or program.
    pub name: NonEmptyString,
}

/// Trainer assigned to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainerRef {
    /// Backend identifier of the trainer.
    pub id: Uuid,
    /// Trainer display name.
    pub name: String,
}

/// Date and time window of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
}

impl Schedule {
    /// Creates a schedule whose start precedes its end.
    pub fn new(date: NaiveDate, start_time: NaiveTime, end_time: NaiveTime) -> AppResult<Self> {
        if start_time >= end_time {
            return Err(AppError::Validation(format!(
                "session start time {start_time} must be before end time {end_time}"
            )));
        }

        Ok(Self {
            date,
            start_time,
            end_time,
        })
    }

    /// Returns the scheduled date.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Returns the start time.
    #[must_use]
    pub fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    /// Returns the end time.
    #[must_use]
    pub fn end_time(&self) -> NaiveTime {
        self.end_time
    }
}

/// Inclusive range accepted for grades.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeScale {
    min: f64,
    max: f64,
}

impl GradeScale {
    /// Creates a scale with finite bounds and `min < max`.
    pub fn new(min: f64, max: f64) -> AppResult<Self> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(AppError::Validation(format!(
                "grade scale {min}..={max} is invalid"
            )));
        }

        Ok(Self { min, max })
    }

    /// Returns the lowest accepted grade.
    #[must_use]
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Returns the highest accepted grade.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Validates a raw value against the scale.
    pub fn grade(&self, value: f64) -> Result<Grade, ParticipantMutationError> {
        if !value.is_finite() || value < self.min || value > self.max {
            return Err(ParticipantMutationError::GradeOutOfRange {
                grade: value,
                min: self.min,
                max: self.max,
            });
        }

        Ok(Grade(value))
    }
}

impl Default for GradeScale {
    fn default() -> Self {
        Self { min: 0.0, max: 100.0 }
    }
}

/// Grade validated against a [`GradeScale`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Grade(f64);

impl Grade {
    /// Returns the numeric value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Whether the session ends with an exam, and its passing grade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExamPolicy {
    /// No exam is taken.
    NotApplicable,
    /// Attendees take an exam graded against `minimum_grade`.
    Required {
        /// Lowest passing grade.
        minimum_grade: Grade,
    },
}

impl ExamPolicy {
    /// Builds the policy from the flag and nullable grade of the wire format.
    ///
    /// The minimum grade must be present exactly when the exam applies.
    pub fn from_parts(
        exam_applies: bool,
        minimum_grade: Option<f64>,
        scale: GradeScale,
    ) -> AppResult<Self> {
        match (exam_applies, minimum_grade) {
            (true, Some(value)) => {
                let minimum_grade = scale
                    .grade(value)
                    .map_err(|error| AppError::Validation(format!("minimum grade: {error}")))?;
                Ok(Self::Required { minimum_grade })
            }
            (false, None) => Ok(Self::NotApplicable),
            (true, None) => Err(AppError::Validation(
                "minimum grade is required when the exam applies".to_owned(),
            )),
            (false, Some(_)) => Err(AppError::Validation(
                "minimum grade must be null when the exam does not apply".to_owned(),
            )),
        }
    }

    /// Returns whether attendees take an exam.
    #[must_use]
    pub fn applies(&self) -> bool {
        matches!(self, Self::Required { .. })
    }

    /// Returns the passing grade, if the exam applies.
    #[must_use]
    pub fn minimum_grade(&self) -> Option<Grade> {
        match self {
            Self::NotApplicable => None,
            Self::Required { minimum_grade } => Some(*minimum_grade),
        }
    }
}

/// Input payload used to construct a validated training session.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSessionInput {
    /// Session identifier.
    pub id: SessionId,
    /// Display name.
    pub name: String,
    /// Activity kind.
    pub training_type: TrainingType,
    /// Internal or external delivery.
    pub modality: Modality,
    /// Date and time window, once scheduled.
    pub schedule: Option<Schedule>,
    /// Assigned trainer, once known.
    pub trainer: Option<TrainerRef>,
    /// Exam policy.
    pub exam: ExamPolicy,
    /// Accepted grade range.
    pub grade_scale: GradeScale,
    /// Whether attendees receive a diploma.
    pub diploma_applies: bool,
    /// Learning objective.
    pub objective: Option<String>,
    /// Free-text observations.
    pub observations: Option<String>,
    /// Plan or program of origin.
    pub origin: TrainingOrigin,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Reason given by HR the last time the session was returned.
    pub last_review_note: Option<String>,
}

/// One scheduled occurrence of a training activity.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSession {
    id: SessionId,
    name: NonEmptyString,
    training_type: TrainingType,
    modality: Modality,
    schedule: Option<Schedule>,
    trainer: Option<TrainerRef>,
    exam: ExamPolicy,
    grade_scale: GradeScale,
    diploma_applies: bool,
    objective: Option<String>,
    observations: Option<String>,
    origin: TrainingOrigin,
    state: SessionState,
    last_review_note: Option<String>,
}

impl TrainingSession {
    /// Creates a validated training session.
    pub fn new(input: TrainingSessionInput) -> AppResult<Self> {
        let TrainingSessionInput {
            id,
            name,
            training_type,
            modality,
            schedule,
            trainer,
            exam,
            grade_scale,
            diploma_applies,
            objective,
            observations,
            origin,
            state,
            last_review_note,
        } = input;

        if let Some(minimum_grade) = exam.minimum_grade() {
            grade_scale
                .grade(minimum_grade.value())
                .map_err(|error| AppError::Validation(format!("minimum grade: {error}")))?;
        }

        let needs_assignment = !matches!(
            state,
            SessionState::Created | SessionState::PendingAssignment | SessionState::Cancelled
        );
        if needs_assignment && (trainer.is_none() || schedule.is_none()) {
            return Err(AppError::Validation(format!(
                "session in state {state} requires a trainer and a schedule"
            )));
        }

        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            training_type,
            modality,
            schedule,
            trainer,
            exam,
            grade_scale,
            diploma_applies,
            objective: normalize_text(objective),
            observations: normalize_text(observations),
            origin,
            state,
            last_review_note: normalize_text(last_review_note),
        })
    }

    /// Returns the session identifier.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the activity kind.
    #[must_use]
    pub fn training_type(&self) -> TrainingType {
        self.training_type
    }

    /// Returns the delivery modality.
    #[must_use]
    pub fn modality(&self) -> Modality {
        self.modality
    }

    /// Returns the schedule, once assigned.
    #[must_use]
    pub fn schedule(&self) -> Option<&Schedule> {
        self.schedule.as_ref()
    }

    /// Returns the trainer, once assigned.
    #[must_use]
    pub fn trainer(&self) -> Option<&TrainerRef> {
        self.trainer.as_ref()
    }

    /// Returns the exam policy.
    #[must_use]
    pub fn exam(&self) -> ExamPolicy {
        self.exam
    }

    /// Returns the accepted grade range.
    #[must_use]
    pub fn grade_scale(&self) -> GradeScale {
        self.grade_scale
    }

    /// Returns whether attendees receive a diploma.
    #[must_use]
    pub fn diploma_applies(&self) -> bool {
        self.diploma_applies
    }

    /// Returns the learning objective.
    #[must_use]
    pub fn objective(&self) -> Option<&str> {
        self.objective.as_deref()
    }

    /// Returns free-text observations.
    #[must_use]
    pub fn observations(&self) -> Option<&str> {
        self.observations.as_deref()
    }

    /// Returns the plan or program of origin.
    #[must_use]
    pub fn origin(&self) -> &TrainingOrigin {
        &self.origin
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the reason given by HR the last time the session was returned.
    #[must_use]
    pub fn last_review_note(&self) -> Option<&str> {
        self.last_review_note.as_deref()
    }

    /// Moves the session along one legal edge.
    ///
    /// Only the state table is checked here. Finalization must additionally
    /// pass the completion gate, and assignment goes through [`Self::assign`].
    pub fn apply_transition(
        &mut self,
        target: SessionState,
    ) -> Result<TransitionKind, LifecycleError> {
        let kind = self.state.transition_to(target)?;
        if kind == TransitionKind::Assign && (self.trainer.is_none() || self.schedule.is_none()) {
            return Err(LifecycleError::InvalidAssignment(
                "trainer and schedule must be set before the session is assigned".to_owned(),
            ));
        }

        self.state = target;
        Ok(kind)
    }

    /// Records the HR reason for returning the session to the trainer.
    pub fn set_review_note(&mut self, note: Option<String>) {
        self.last_review_note = normalize_text(note);
    }

    /// Assigns trainer, schedule and participants and moves to ASSIGNED.
    ///
    /// Returns the fresh roster with every participant's attendance unset.
    pub fn assign(&mut self, assignment: SessionAssignment) -> Result<Roster, LifecycleError> {
        self.state.transition_to(SessionState::Assigned)?;

        let SessionAssignment {
            trainer,
            schedule,
            participants,
        } = assignment;

        if participants.is_empty() {
            return Err(LifecycleError::InvalidAssignment(
                "at least one participant is required".to_owned(),
            ));
        }

        let mut seen = BTreeSet::new();
        if let Some(duplicate) = participants.iter().find(|id| !seen.insert(**id)) {
            return Err(LifecycleError::InvalidAssignment(format!(
                "participant {duplicate} is listed twice"
            )));
        }

        let roster = Roster::with_participants(self, participants)?;
        self.trainer = Some(trainer);
        self.schedule = Some(schedule);
        self.state = SessionState::Assigned;

        Ok(roster)
    }
}

/// Trainer, schedule and participants chosen for a pending session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAssignment {
    /// Trainer running the session.
    pub trainer: TrainerRef,
    /// Date and time window.
    pub schedule: Schedule,
    /// Participants to enrol.
    pub participants: Vec<ParticipantId>,
}

fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use uuid::Uuid;

    use super::{ExamPolicy, GradeScale, Schedule, SessionAssignment, TrainerRef};
    use crate::test_support::session_in;
    use crate::{LifecycleError, ParticipantId, SessionState};

    fn schedule() -> Schedule {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap_or_default();
        let start = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default();
        let end = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default();
        match Schedule::new(date, start, end) {
            Ok(schedule) => schedule,
            Err(error) => panic!("schedule should be valid: {error}"),
        }
    }

    fn trainer() -> TrainerRef {
        TrainerRef {
            id: Uuid::new_v4(),
            name: "Marta Ruiz".to_owned(),
        }
    }

    #[test]
    fn exam_policy_requires_minimum_grade_iff_exam_applies() {
        let scale = GradeScale::default();
        assert!(ExamPolicy::from_parts(true, Some(70.0), scale).is_ok());
        assert!(ExamPolicy::from_parts(false, None, scale).is_ok());
        assert!(ExamPolicy::from_parts(true, None, scale).is_err());
        assert!(ExamPolicy::from_parts(false, Some(70.0), scale).is_err());
        assert!(ExamPolicy::from_parts(true, Some(120.0), scale).is_err());
    }

    #[test]
    fn schedule_rejects_inverted_window() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap_or_default();
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default();
        assert!(Schedule::new(date, nine, nine).is_err());
    }

    #[test]
    fn grade_scale_requires_ordered_bounds() {
        assert!(GradeScale::new(10.0, 10.0).is_err());
        assert!(GradeScale::new(0.0, f64::INFINITY).is_err());
        assert!(GradeScale::new(1.0, 7.0).is_ok());
    }

    #[test]
    fn assign_builds_unmarked_roster() {
        let mut session = session_in(SessionState::PendingAssignment, ExamPolicy::NotApplicable);
        let participants = vec![ParticipantId::new(), ParticipantId::new()];

        let roster = session.assign(SessionAssignment {
            trainer: trainer(),
            schedule: schedule(),
            participants: participants.clone(),
        });

        let Ok(roster) = roster else {
            panic!("assignment should succeed");
        };
        assert_eq!(session.state(), SessionState::Assigned);
        assert_eq!(roster.len(), 2);
        assert!(session.trainer().is_some());
    }

    #[test]
    fn assign_rejects_duplicate_participants() {
        let mut session = session_in(SessionState::PendingAssignment, ExamPolicy::NotApplicable);
        let participant = ParticipantId::new();

        let result = session.assign(SessionAssignment {
            trainer: trainer(),
            schedule: schedule(),
            participants: vec![participant, participant],
        });

        assert!(matches!(result, Err(LifecycleError::InvalidAssignment(_))));
        assert_eq!(session.state(), SessionState::PendingAssignment);
    }

    #[test]
    fn assign_outside_pending_state_is_invalid_transition() {
        let mut session = session_in(SessionState::InProgress, ExamPolicy::NotApplicable);

        let result = session.assign(SessionAssignment {
            trainer: trainer(),
            schedule: schedule(),
            participants: vec![ParticipantId::new()],
        });

        assert!(matches!(
            result,
            Err(LifecycleError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn apply_transition_leaves_state_on_rejection() {
        let mut session = session_in(SessionState::Finalized, ExamPolicy::NotApplicable);
        let result = session.apply_transition(SessionState::InProgress);

        assert!(result.is_err());
        assert_eq!(session.state(), SessionState::Finalized);
    }
}
