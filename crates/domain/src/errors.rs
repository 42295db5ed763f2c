use thiserror::Error;

use crate::{FinalizationBlocker, ParticipantId, SessionState};

/// Rule violations raised by the session lifecycle and roster.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LifecycleError {
    /// Requested state is not reachable from the current one.
    #[error("cannot move session from {from} to {to}")]
    InvalidTransition {
        /// Current state.
        from: SessionState,
        /// Requested state.
        to: SessionState,
    },

    /// Finalization attempted while one or more gate rules fail.
    #[error("session cannot be finalized: {}", describe_blockers(.0))]
    FinalizationBlocked(Vec<FinalizationBlocker>),

    /// Roster mutation rejected without applying any change.
    #[error(transparent)]
    InvalidParticipantMutation(#[from] ParticipantMutationError),

    /// Trainer, schedule or participant list is not usable for assignment.
    #[error("invalid assignment: {0}")]
    InvalidAssignment(String),
}

/// Reasons a roster mutation is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParticipantMutationError {
    /// No record exists for the participant.
    #[error("participant {0} is not on the roster")]
    UnknownParticipant(ParticipantId),

    /// The participant is already on the roster.
    #[error("participant {0} is already on the roster")]
    DuplicateParticipant(ParticipantId),

    /// Grades and documents require the participant to be marked present.
    #[error("participant {0} is not marked present")]
    NotPresent(ParticipantId),

    /// Grade is outside the scoring scale of the session.
    #[error("grade {grade} is outside the range {min}..={max}")]
    GradeOutOfRange {
        /// Rejected grade.
        grade: f64,
        /// Lowest accepted grade.
        min: f64,
        /// Highest accepted grade.
        max: f64,
    },

    /// Exam documents were sent for a session without an exam.
    #[error("session does not require an exam")]
    ExamNotApplicable,

    /// Diplomas were sent for a session that does not issue them.
    #[error("session does not issue diplomas")]
    DiplomaNotApplicable,

    /// The session state does not accept this roster change.
    #[error("roster cannot be changed while the session is {0}")]
    NotAllowedInState(SessionState),
}

fn describe_blockers(blockers: &[FinalizationBlocker]) -> String {
    blockers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
