use async_trait::async_trait;
use capacita_domain::{
    DocumentRef, ParticipantId, ParticipantMutationError, ParticipantRecord, ParticipantStatus,
    Roster, SessionAssignment, SessionId, SessionState, TrainingSession, UserAccess,
};

use crate::{RosterCommand, SessionResult};

/// Session plus roster as returned by `GET /sessions/{id}`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// Session attributes and state.
    pub session: TrainingSession,
    /// Participant records.
    pub roster: Roster,
}

/// State change sent to `PATCH /sessions/{id}/state`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionCommand {
    /// Requested state.
    pub target_state: SessionState,
    /// Optional reason, used when HR returns a session to the trainer.
    pub reason: Option<String>,
}

/// One roster change sent to `PATCH /sessions/{id}/participants/{pid}`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParticipantPatch {
    /// Marks the participant present or absent.
    Attendance(bool),
    /// Records a grade.
    Grade(f64),
    /// Attaches an uploaded exam.
    AttachExam(DocumentRef),
    /// Removes the exam.
    RemoveExam,
    /// Attaches an issued diploma.
    AttachDiploma(DocumentRef),
    /// Removes the diploma.
    RemoveDiploma,
    /// Replaces free-text observations.
    Observations(Option<String>),
}

impl ParticipantPatch {
    /// Returns a stable label used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attendance(_) => "attendance",
            Self::Grade(_) => "grade",
            Self::AttachExam(_) => "attach_exam",
            Self::RemoveExam => "remove_exam",
            Self::AttachDiploma(_) => "attach_diploma",
            Self::RemoveDiploma => "remove_diploma",
            Self::Observations(_) => "observations",
        }
    }

    /// Returns the permission category the change falls under.
    #[must_use]
    pub fn roster_command(&self) -> RosterCommand {
        match self {
            Self::AttachDiploma(_) | Self::RemoveDiploma => RosterCommand::Diploma,
            _ => RosterCommand::Mark,
        }
    }

    /// Rejects the change when the session state does not accept it.
    pub fn ensure_allowed_in(&self, state: SessionState) -> Result<(), ParticipantMutationError> {
        let allowed = match self {
            Self::AttachDiploma(_) | Self::RemoveDiploma => state.accepts_diplomas(),
            _ => state.accepts_marks(),
        };

        if allowed {
            Ok(())
        } else {
            Err(ParticipantMutationError::NotAllowedInState(state))
        }
    }

    /// Applies the change to a roster and returns the participant's new status.
    ///
    /// The roster is left untouched when the change is rejected.
    pub fn apply_to(
        &self,
        roster: &mut Roster,
        participant_id: ParticipantId,
    ) -> Result<ParticipantStatus, ParticipantMutationError> {
        match self {
            Self::Attendance(present) => return roster.set_attendance(participant_id, *present),
            Self::Grade(value) => return roster.set_grade(participant_id, *value),
            Self::AttachExam(document) => roster.attach_exam(participant_id, document.clone())?,
            Self::RemoveExam => {
                roster.remove_exam(participant_id)?;
            }
            Self::AttachDiploma(document) => {
                roster.attach_diploma(participant_id, document.clone())?;
            }
            Self::RemoveDiploma => {
                roster.remove_diploma(participant_id)?;
            }
            Self::Observations(text) => roster.set_observations(participant_id, text.clone())?,
        }

        roster.status_of(participant_id)
    }
}

/// Backend port for training sessions. The backend is the system of record
/// and re-validates every command.
#[async_trait]
pub trait TrainingBackend: Send + Sync {
    /// Loads a session and its roster.
    async fn fetch_session(&self, session_id: SessionId) -> SessionResult<SessionSnapshot>;

    /// Commits a state change and returns the updated session.
    async fn commit_transition(
        &self,
        session_id: SessionId,
        command: TransitionCommand,
    ) -> SessionResult<TrainingSession>;

    /// Stores trainer, schedule and participants, moving the session to ASSIGNED.
    async fn assign_session(
        &self,
        session_id: SessionId,
        assignment: SessionAssignment,
    ) -> SessionResult<SessionSnapshot>;

    /// Applies one roster change and returns the stored record.
    async fn patch_participant(
        &self,
        session_id: SessionId,
        participant_id: ParticipantId,
        patch: ParticipantPatch,
    ) -> SessionResult<ParticipantRecord>;

    /// Enrols a participant before the session starts.
    async fn add_participant(
        &self,
        session_id: SessionId,
        participant_id: ParticipantId,
    ) -> SessionResult<ParticipantRecord>;

    /// Removes a participant before the session starts.
    async fn remove_participant(
        &self,
        session_id: SessionId,
        participant_id: ParticipantId,
    ) -> SessionResult<()>;
}

/// Backend port for the signed-in user.
#[async_trait]
pub trait AccessBackend: Send + Sync {
    /// Loads the current user and their roles.
    async fn current_user(&self) -> SessionResult<UserAccess>;
}
