//! Application services and ports for training sessions.

#![forbid(unsafe_code)]

mod authorization_service;
mod errors;
mod ports;
mod session_orchestrator;
mod session_workspace;

pub use authorization_service::{AuthorizationService, RosterCommand};
pub use errors::{ErrorKind, ErrorResolution, SessionError, SessionResult};
pub use ports::{
    AccessBackend, ParticipantPatch, SessionSnapshot, TrainingBackend, TransitionCommand,
};
pub use session_orchestrator::SessionOrchestrator;
pub use session_workspace::SessionWorkspace;

#[cfg(test)]
mod test_support {
    use capacita_core::{NonEmptyString, UserIdentity};
    use capacita_domain::{
        DocumentRef, ExamPolicy, GradeScale, Modality, OriginKind, ParticipantId, Permission,
        Role, Roster, Schedule, SessionId, SessionState, TrainerRef, TrainingOrigin,
        TrainingSession, TrainingSessionInput, TrainingType, UserAccess,
    };
    use chrono::{NaiveDate, NaiveTime};
    use uuid::Uuid;

    use crate::SessionSnapshot;

    pub fn document(value: &str) -> DocumentRef {
        match DocumentRef::new(value) {
            Ok(document) => document,
            Err(error) => panic!("document should be valid: {error}"),
        }
    }

    pub fn user_with(permissions: &[Permission]) -> UserAccess {
        let Ok(role) = Role::new("Test role", Permission::keys(permissions)) else {
            panic!("role should be valid");
        };
        UserAccess::new(UserIdentity::new("alice", "Alice", None), vec![role])
    }

    pub fn schedule() -> Schedule {
        let date = NaiveDate::from_ymd_opt(2026, 5, 4).unwrap_or_default();
        let start = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default();
        let end = NaiveTime::from_hms_opt(11, 0, 0).unwrap_or_default();
        match Schedule::new(date, start, end) {
            Ok(schedule) => schedule,
            Err(error) => panic!("schedule should be valid: {error}"),
        }
    }

    pub fn trainer() -> TrainerRef {
        TrainerRef {
            id: Uuid::new_v4(),
            name: "Marta Ruiz".to_owned(),
        }
    }

    /// Session with trainer and schedule set; the exam requires a 70.
    pub fn session(state: SessionState, exam_applies: bool) -> TrainingSession {
        let staffed = !matches!(state, SessionState::PendingAssignment);
        let (Ok(exam), Ok(origin_name)) = (
            ExamPolicy::from_parts(
                exam_applies,
                exam_applies.then_some(70.0),
                GradeScale::default(),
            ),
            NonEmptyString::new("Safety program"),
        ) else {
            panic!("fixture values should be valid");
        };

        let session = TrainingSession::new(TrainingSessionInput {
            id: SessionId::new(),
            name: "Working at heights".to_owned(),
            training_type: TrainingType::Course,
            modality: Modality::Internal,
            schedule: staffed.then(schedule),
            trainer: staffed.then(trainer),
            exam,
            grade_scale: GradeScale::default(),
            diploma_applies: true,
            objective: None,
            observations: None,
            origin: TrainingOrigin {
                kind: OriginKind::Program,
                name: origin_name,
            },
            state,
            last_review_note: None,
        });

        match session {
            Ok(session) => session,
            Err(error) => panic!("session should be valid: {error}"),
        }
    }

    pub fn snapshot(
        state: SessionState,
        exam_applies: bool,
        participants: &[ParticipantId],
    ) -> SessionSnapshot {
        let session = session(state, exam_applies);
        let roster = match Roster::with_participants(&session, participants.to_vec()) {
            Ok(roster) => roster,
            Err(error) => panic!("roster should be valid: {error}"),
        };

        SessionSnapshot { session, roster }
    }
}
