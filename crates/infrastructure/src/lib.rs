//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod credential_store;
mod http_training_backend;
mod in_memory_training_backend;
mod wire;

pub use credential_store::CredentialStore;
pub use http_training_backend::HttpTrainingBackend;
pub use in_memory_training_backend::InMemoryTrainingBackend;

#[cfg(test)]
mod test_support {
    use capacita_application::SessionSnapshot;
    use capacita_core::{NonEmptyString, UserIdentity};
    use capacita_domain::{
        DocumentRef, ExamPolicy, GradeScale, Modality, OriginKind, ParticipantId, Permission,
        Role, Roster, Schedule, SessionId, SessionState, TrainerRef, TrainingOrigin,
        TrainingSession, TrainingSessionInput, TrainingType, UserAccess,
    };
    use chrono::{NaiveDate, NaiveTime};
    use uuid::Uuid;

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
        UserAccess::new(
            UserIdentity::new("jordan", "Jordan", Some("jordan@example.com".to_owned())),
            vec![role],
        )
    }

    pub fn schedule() -> Schedule {
        let date = NaiveDate::from_ymd_opt(2026, 6, 8).unwrap_or_default();
        let start = NaiveTime::from_hms_opt(14, 0, 0).unwrap_or_default();
        let end = NaiveTime::from_hms_opt(17, 30, 0).unwrap_or_default();
        match Schedule::new(date, start, end) {
            Ok(schedule) => schedule,
            Err(error) => panic!("schedule should be valid: {error}"),
        }
    }

    pub fn trainer() -> TrainerRef {
        TrainerRef {
            id: Uuid::new_v4(),
            name: "Luis Ortega".to_owned(),
        }
    }

    /// Stored session; staffed unless still pending assignment.
    pub fn snapshot(
        state: SessionState,
        exam_applies: bool,
        participants: &[ParticipantId],
    ) -> SessionSnapshot {
        let staffed = state != SessionState::PendingAssignment;
        let (Ok(exam), Ok(origin_name)) = (
            ExamPolicy::from_parts(
                exam_applies,
                exam_applies.then_some(70.0),
                GradeScale::default(),
            ),
            NonEmptyString::new("Annual safety plan"),
        ) else {
            panic!("fixture values should be valid");
        };

        let session = TrainingSession::new(TrainingSessionInput {
            id: SessionId::new(),
            name: "Forklift operation".to_owned(),
            training_type: TrainingType::Course,
            modality: Modality::External,
            schedule: staffed.then(schedule),
            trainer: staffed.then(trainer),
            exam,
            grade_scale: GradeScale::default(),
            diploma_applies: true,
            objective: Some("Certify warehouse staff".to_owned()),
            observations: None,
            origin: TrainingOrigin {
                kind: OriginKind::Plan,
                name: origin_name,
            },
            state,
            last_review_note: None,
        });
        let Ok(session) = session else {
            panic!("session should be valid");
        };
        let Ok(roster) = Roster::with_participants(&session, participants.to_vec()) else {
            panic!("roster should be valid");
        };

        SessionSnapshot { session, roster }
    }
}
