//! JSON payloads exchanged with the training backend.

mod conversions;
mod types;

pub use types::{
    AddParticipantRequest, AssignmentRequest, CurrentUserResponse, ErrorResponse,
    ParticipantPatchRequest, ParticipantResponse, SessionResponse, SessionSnapshotResponse,
    TransitionRequest,
};
