use std::collections::BTreeMap;

use capacita_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ExamPolicy, Grade, GradeScale, ParticipantMutationError, TrainingSession};

/// Unique identifier for a participant (an employee enrolled in a session).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId(Uuid);

impl ParticipantId {
    /// Creates a new random participant identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a participant identifier from an existing UUID value.
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

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Tri-state attendance mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Attendance {
    /// Not marked yet.
    #[default]
    Unset,
    /// Attended.
    Present,
    /// Did not attend.
    Absent,
}

impl Attendance {
    /// Converts the nullable boolean used on the wire.
    #[must_use]
    pub fn from_flag(value: Option<bool>) -> Self {
        match value {
            None => Self::Unset,
            Some(true) => Self::Present,
            Some(false) => Self::Absent,
        }
    }

    /// Returns the nullable boolean used on the wire.
    #[must_use]
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Unset => None,
            Self::Present => Some(true),
            Self::Absent => Some(false),
        }
    }

    /// Returns whether attendance was marked either way.
    #[must_use]
    pub fn is_marked(&self) -> bool {
        !matches!(self, Self::Unset)
    }
}

/// Reference to a document held by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef(NonEmptyString);

impl DocumentRef {
    /// Creates a document reference.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        NonEmptyString::new(value)
            .map(Self)
            .map_err(|_| AppError::Validation("document reference must not be empty".to_owned()))
    }

    /// Returns the reference string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for DocumentRef {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Progress of one participant, always derived and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantStatus {
    /// Attendance not marked.
    Pending,
    /// Marked absent.
    DidNotAttend,
    /// Attended a session without exam.
    Attended,
    /// Attended, exam grade not recorded yet.
    AttendedUngraded,
    /// Grade reached the minimum.
    Passed,
    /// Grade below the minimum.
    Failed,
}

impl ParticipantStatus {
    /// Derives the status from attendance, grade and the session's exam policy.
    #[must_use]
    pub fn derive(attendance: Attendance, grade: Option<Grade>, exam: ExamPolicy) -> Self {
        match (attendance, exam) {
            (Attendance::Unset, _) => Self::Pending,
            (Attendance::Absent, _) => Self::DidNotAttend,
            (Attendance::Present, ExamPolicy::NotApplicable) => Self::Attended,
            (Attendance::Present, ExamPolicy::Required { minimum_grade }) => match grade {
                None => Self::AttendedUngraded,
                Some(grade) if grade.value() >= minimum_grade.value() => Self::Passed,
                Some(_) => Self::Failed,
            },
        }
    }
}

/// Per-session record of one participant.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantRecord {
    participant_id: ParticipantId,
    attendance: Attendance,
    grade: Option<Grade>,
    exam: Option<DocumentRef>,
    diploma: Option<DocumentRef>,
    observations: Option<String>,
}

impl ParticipantRecord {
    /// Creates an unmarked record.
    #[must_use]
    pub fn new(participant_id: ParticipantId) -> Self {
        Self {
            participant_id,
            attendance: Attendance::Unset,
            grade: None,
            exam: None,
            diploma: None,
            observations: None,
        }
    }

    /// Rebuilds a record loaded from the backend.
    ///
    /// Grade and documents are only kept when the participant is present.
    #[must_use]
    pub fn restore(
        participant_id: ParticipantId,
        attendance: Attendance,
        grade: Option<Grade>,
        exam: Option<DocumentRef>,
        diploma: Option<DocumentRef>,
        observations: Option<String>,
    ) -> Self {
        let present = attendance == Attendance::Present;
        Self {
            participant_id,
            attendance,
            grade: grade.filter(|_| present),
            exam: exam.filter(|_| present),
            diploma: diploma.filter(|_| present),
            observations,
        }
    }

    /// Returns the participant identifier.
    #[must_use]
    pub fn participant_id(&self) -> ParticipantId {
        self.participant_id
    }

    /// Returns the attendance mark.
    #[must_use]
    pub fn attendance(&self) -> Attendance {
        self.attendance
    }

    /// Returns the recorded grade.
    #[must_use]
    pub fn grade(&self) -> Option<Grade> {
        self.grade
    }

    /// Returns the uploaded exam.
    #[must_use]
    pub fn exam(&self) -> Option<&DocumentRef> {
        self.exam.as_ref()
    }

    /// Returns the issued diploma.
    #[must_use]
    pub fn diploma(&self) -> Option<&DocumentRef> {
        self.diploma.as_ref()
    }

    /// Returns free-text observations.
    #[must_use]
    pub fn observations(&self) -> Option<&str> {
        self.observations.as_deref()
    }

    /// Returns the derived status under the given exam policy.
    #[must_use]
    pub fn status(&self, exam: ExamPolicy) -> ParticipantStatus {
        ParticipantStatus::derive(self.attendance, self.grade, exam)
    }

    fn ensure_present(&self) -> Result<(), ParticipantMutationError> {
        if self.attendance != Attendance::Present {
            return Err(ParticipantMutationError::NotPresent(self.participant_id));
        }

        Ok(())
    }
}

/// Session attributes the roster needs to validate mutations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RosterRules {
    /// Exam policy of the session.
    pub exam: ExamPolicy,
    /// Whether the session issues diplomas.
    pub diploma_applies: bool,
    /// Accepted grade range.
    pub grade_scale: GradeScale,
}

impl RosterRules {
    /// Copies the rules of a session.
    #[must_use]
    pub fn of(session: &TrainingSession) -> Self {
        Self {
            exam: session.exam(),
            diploma_applies: session.diploma_applies(),
            grade_scale: session.grade_scale(),
        }
    }
}

/// Participant records of one session, keyed by participant.
///
/// Every mutation either applies fully or returns an error and leaves the
/// roster untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    rules: RosterRules,
    records: BTreeMap<ParticipantId, ParticipantRecord>,
}

impl Roster {
    /// Creates a roster from loaded records.
    pub fn new(rules: RosterRules, records: Vec<ParticipantRecord>) -> AppResult<Self> {
        let mut by_id = BTreeMap::new();
        for record in records {
            let participant_id = record.participant_id;
            if by_id.insert(participant_id, record).is_some() {
                return Err(AppError::Validation(format!(
                    "participant {participant_id} appears twice in the roster"
                )));
            }
        }

        Ok(Self {
            rules,
            records: by_id,
        })
    }

    /// Creates an unmarked roster for the given participants.
    pub fn with_participants(
        session: &TrainingSession,
        participants: Vec<ParticipantId>,
    ) -> Result<Self, ParticipantMutationError> {
        let mut records = BTreeMap::new();
        for participant_id in participants {
            if records
                .insert(participant_id, ParticipantRecord::new(participant_id))
                .is_some()
            {
                return Err(ParticipantMutationError::DuplicateParticipant(
                    participant_id,
                ));
            }
        }

        Ok(Self {
            rules: RosterRules::of(session),
            records,
        })
    }

    /// Returns the rules the roster validates against.
    #[must_use]
    pub fn rules(&self) -> RosterRules {
        self.rules
    }

    /// Returns the number of participants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns whether the roster has no participants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns one participant record.
    #[must_use]
    pub fn get(&self, participant_id: ParticipantId) -> Option<&ParticipantRecord> {
        self.records.get(&participant_id)
    }

    /// Iterates records in participant order.
    pub fn iter(&self) -> impl Iterator<Item = &ParticipantRecord> {
        self.records.values()
    }

    /// Returns the derived status of one participant.
    pub fn status_of(
        &self,
        participant_id: ParticipantId,
    ) -> Result<ParticipantStatus, ParticipantMutationError> {
        Ok(self.record(participant_id)?.status(self.rules.exam))
    }

    /// Marks one participant present or absent.
    ///
    /// Marking absent drops grade and documents, which only apply to attendees.
    pub fn set_attendance(
        &mut self,
        participant_id: ParticipantId,
        present: bool,
    ) -> Result<ParticipantStatus, ParticipantMutationError> {
        let exam = self.rules.exam;
        let record = self.record_mut(participant_id)?;
        apply_attendance(record, present);
        Ok(record.status(exam))
    }

    /// Marks several participants at once. Unknown ids reject the whole batch.
    pub fn set_attendance_for_many(
        &mut self,
        participant_ids: &[ParticipantId],
        present: bool,
    ) -> Result<(), ParticipantMutationError> {
        if let Some(unknown) = participant_ids
            .iter()
            .find(|participant_id| !self.records.contains_key(participant_id))
        {
            return Err(ParticipantMutationError::UnknownParticipant(*unknown));
        }

        for participant_id in participant_ids {
            if let Some(record) = self.records.get_mut(participant_id) {
                apply_attendance(record, present);
            }
        }

        Ok(())
    }

    /// Records the grade of a present participant.
    pub fn set_grade(
        &mut self,
        participant_id: ParticipantId,
        value: f64,
    ) -> Result<ParticipantStatus, ParticipantMutationError> {
        let RosterRules {
            exam, grade_scale, ..
        } = self.rules;
        let grade = grade_scale.grade(value)?;
        let record = self.record_mut(participant_id)?;
        record.ensure_present()?;

        record.grade = Some(grade);
        Ok(record.status(exam))
    }

    /// Attaches the uploaded exam of a present participant.
    pub fn attach_exam(
        &mut self,
        participant_id: ParticipantId,
        document: DocumentRef,
    ) -> Result<(), ParticipantMutationError> {
        if !self.rules.exam.applies() {
            return Err(ParticipantMutationError::ExamNotApplicable);
        }
        let record = self.record_mut(participant_id)?;
        record.ensure_present()?;

        record.exam = Some(document);
        Ok(())
    }

    /// Removes the exam of a participant, returning the removed reference.
    pub fn remove_exam(
        &mut self,
        participant_id: ParticipantId,
    ) -> Result<Option<DocumentRef>, ParticipantMutationError> {
        Ok(self.record_mut(participant_id)?.exam.take())
    }

    /// Attaches the diploma of a present participant.
    pub fn attach_diploma(
        &mut self,
        participant_id: ParticipantId,
        document: DocumentRef,
    ) -> Result<(), ParticipantMutationError> {
        if !self.rules.diploma_applies {
            return Err(ParticipantMutationError::DiplomaNotApplicable);
        }
        let record = self.record_mut(participant_id)?;
        record.ensure_present()?;

        record.diploma = Some(document);
        Ok(())
    }

    /// Removes the diploma of a participant, returning the removed reference.
    pub fn remove_diploma(
        &mut self,
        participant_id: ParticipantId,
    ) -> Result<Option<DocumentRef>, ParticipantMutationError> {
        Ok(self.record_mut(participant_id)?.diploma.take())
    }

    /// Replaces the observations of a participant.
    pub fn set_observations(
        &mut self,
        participant_id: ParticipantId,
        observations: Option<String>,
    ) -> Result<(), ParticipantMutationError> {
        self.record_mut(participant_id)?.observations = observations
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty());
        Ok(())
    }

    /// Enrols a participant.
    pub fn add_participant(
        &mut self,
        participant_id: ParticipantId,
    ) -> Result<(), ParticipantMutationError> {
        if self.records.contains_key(&participant_id) {
            return Err(ParticipantMutationError::DuplicateParticipant(
                participant_id,
            ));
        }

        self.records
            .insert(participant_id, ParticipantRecord::new(participant_id));
        Ok(())
    }

    /// Removes a participant from the roster.
    pub fn remove_participant(
        &mut self,
        participant_id: ParticipantId,
    ) -> Result<ParticipantRecord, ParticipantMutationError> {
        self.records
            .remove(&participant_id)
            .ok_or(ParticipantMutationError::UnknownParticipant(participant_id))
    }

    /// Replaces one record with the version confirmed by the backend.
    pub fn replace_record(
        &mut self,
        record: ParticipantRecord,
    ) -> Result<(), ParticipantMutationError> {
        let slot = self.record_mut(record.participant_id)?;
        *slot = record;
        Ok(())
    }

    fn record(
        &self,
        participant_id: ParticipantId,
    ) -> Result<&ParticipantRecord, ParticipantMutationError> {
        self.records
            .get(&participant_id)
            .ok_or(ParticipantMutationError::UnknownParticipant(participant_id))
    }

    fn record_mut(
        &mut self,
        participant_id: ParticipantId,
    ) -> Result<&mut ParticipantRecord, ParticipantMutationError> {
        self.records
            .get_mut(&participant_id)
            .ok_or(ParticipantMutationError::UnknownParticipant(participant_id))
    }
}

fn apply_attendance(record: &mut ParticipantRecord, present: bool) {
    if present {
        record.attendance = Attendance::Present;
    } else {
        record.attendance = Attendance::Absent;
        record.grade = None;
        record.exam = None;
        record.diploma = None;
    }
}

#[cfg(test)]
mod tests {
    use super::{Attendance, DocumentRef, ParticipantStatus, Roster};
    use crate::test_support::{document, grade, minimum_grade_policy, roster_for, session_in};
    use crate::{ExamPolicy, ParticipantId, ParticipantMutationError, SessionState};

    fn exam_roster(participants: &[ParticipantId]) -> Roster {
        let session = session_in(SessionState::InProgress, minimum_grade_policy(70.0));
        roster_for(&session, participants)
    }

    #[test]
    fn status_follows_attendance_and_grade() {
        let exam = minimum_grade_policy(70.0);

        assert_eq!(
            ParticipantStatus::derive(Attendance::Unset, None, exam),
            ParticipantStatus::Pending
        );
        assert_eq!(
            ParticipantStatus::derive(Attendance::Absent, None, exam),
            ParticipantStatus::DidNotAttend
        );
        assert_eq!(
            ParticipantStatus::derive(Attendance::Present, None, exam),
            ParticipantStatus::AttendedUngraded
        );
        assert_eq!(
            ParticipantStatus::derive(Attendance::Present, Some(grade(70.0)), exam),
            ParticipantStatus::Passed
        );
        assert_eq!(
            ParticipantStatus::derive(Attendance::Present, Some(grade(69.5)), exam),
            ParticipantStatus::Failed
        );
        assert_eq!(
            ParticipantStatus::derive(Attendance::Present, None, ExamPolicy::NotApplicable),
            ParticipantStatus::Attended
        );
    }

    #[test]
    fn grade_for_absent_participant_is_rejected_without_change() {
        let participant = ParticipantId::new();
        let mut roster = exam_roster(&[participant]);
        assert!(roster.set_attendance(participant, false).is_ok());
        let before = roster.clone();

        let result = roster.set_grade(participant, 85.0);

        assert_eq!(
            result,
            Err(ParticipantMutationError::NotPresent(participant))
        );
        assert_eq!(roster, before);
    }

    #[test]
    fn grade_outside_scale_is_rejected() {
        let participant = ParticipantId::new();
        let mut roster = exam_roster(&[participant]);
        assert!(roster.set_attendance(participant, true).is_ok());

        assert!(matches!(
            roster.set_grade(participant, 101.0),
            Err(ParticipantMutationError::GradeOutOfRange { .. })
        ));
        assert!(matches!(
            roster.set_grade(participant, f64::NAN),
            Err(ParticipantMutationError::GradeOutOfRange { .. })
        ));
        assert_eq!(roster.set_grade(participant, 100.0), Ok(ParticipantStatus::Passed));
    }

    #[test]
    fn marking_absent_clears_grade_and_documents() {
        let participant = ParticipantId::new();
        let mut roster = exam_roster(&[participant]);
        assert!(roster.set_attendance(participant, true).is_ok());
        assert!(roster.set_grade(participant, 90.0).is_ok());
        assert!(roster.attach_exam(participant, document("exam-1")).is_ok());

        assert_eq!(
            roster.set_attendance(participant, false),
            Ok(ParticipantStatus::DidNotAttend)
        );

        let record = roster.get(participant);
        assert!(record.is_some_and(|record| record.grade().is_none() && record.exam().is_none()));
    }

    #[test]
    fn bulk_attendance_rejects_unknown_participant_atomically() {
        let known = ParticipantId::new();
        let unknown = ParticipantId::new();
        let mut roster = exam_roster(&[known]);

        let result = roster.set_attendance_for_many(&[known, unknown], true);

        assert_eq!(
            result,
            Err(ParticipantMutationError::UnknownParticipant(unknown))
        );
        assert_eq!(
            roster.get(known).map(|record| record.attendance()),
            Some(Attendance::Unset)
        );
    }

    #[test]
    fn exam_requires_exam_policy() {
        let participant = ParticipantId::new();
        let session = session_in(SessionState::InProgress, ExamPolicy::NotApplicable);
        let mut roster = roster_for(&session, &[participant]);
        assert!(roster.set_attendance(participant, true).is_ok());

        assert_eq!(
            roster.attach_exam(participant, document("exam-1")),
            Err(ParticipantMutationError::ExamNotApplicable)
        );
    }

    #[test]
    fn diploma_requires_presence() {
        let participant = ParticipantId::new();
        let mut roster = exam_roster(&[participant]);

        assert_eq!(
            roster.attach_diploma(participant, document("diploma-1")),
            Err(ParticipantMutationError::NotPresent(participant))
        );
    }

    #[test]
    fn removing_exam_returns_previous_reference() {
        let participant = ParticipantId::new();
        let mut roster = exam_roster(&[participant]);
        assert!(roster.set_attendance(participant, true).is_ok());
        assert!(roster.attach_exam(participant, document("exam-7")).is_ok());

        let removed = roster.remove_exam(participant);
        assert_eq!(removed.ok().flatten().as_ref().map(DocumentRef::as_str), Some("exam-7"));
    }

    #[test]
    fn roster_editing_rejects_duplicates() {
        let participant = ParticipantId::new();
        let mut roster = exam_roster(&[participant]);

        assert_eq!(
            roster.add_participant(participant),
            Err(ParticipantMutationError::DuplicateParticipant(participant))
        );
        assert!(roster.remove_participant(participant).is_ok());
        assert!(roster.is_empty());
    }

    #[test]
    fn repeating_attendance_leaves_record_unchanged() {
        let participant = ParticipantId::new();
        let mut roster = exam_roster(&[participant]);
        assert!(roster.set_attendance(participant, true).is_ok());
        assert!(roster.set_grade(participant, 82.0).is_ok());
        assert!(roster.attach_exam(participant, document("exam-3")).is_ok());
        let before = roster.get(participant).cloned();

        let again = roster.set_attendance(participant, true);

        assert_eq!(again, Ok(ParticipantStatus::Passed));
        assert_eq!(roster.get(participant).cloned(), before);

        assert_eq!(
            roster.set_attendance(participant, false),
            Ok(ParticipantStatus::DidNotAttend)
        );
        let absent = roster.get(participant).cloned();
        assert_eq!(
            roster.set_attendance(participant, false),
            Ok(ParticipantStatus::DidNotAttend)
        );
        assert_eq!(roster.get(participant).cloned(), absent);
    }
}
