//! Training session lifecycle, roster and access rules.

#![forbid(unsafe_code)]

mod access;
mod completion_gate;
mod errors;
mod plan;
mod roster;
mod security;
mod session;
mod session_state;

pub use access::{UserAccess, accessible_screens, has_access};
pub use completion_gate::{
    FinalizationBlocker, FinalizationCheck, can_finalize, evaluate_finalization,
};
pub use errors::{LifecycleError, ParticipantMutationError};
pub use plan::{SessionDraft, derive_sessions};
pub use roster::{
    Attendance, DocumentRef, ParticipantId, ParticipantRecord, ParticipantStatus, Roster,
    RosterRules,
};
pub use security::{
    Permission, PermissionCatalog, PermissionCategory, PermissionDefinition, PermissionKey, Role,
    Screen,
};
pub use session::{
    ExamPolicy, Grade, GradeScale, Modality, OriginKind, Schedule, SessionAssignment, SessionId,
    TrainerRef, TrainingOrigin, TrainingSession, TrainingSessionInput, TrainingType,
};
pub use session_state::{SessionState, TransitionKind};
