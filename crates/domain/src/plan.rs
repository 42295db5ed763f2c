use capacita_core::{AppError, AppResult};

use crate::{
    ExamPolicy, GradeScale, Modality, SessionId, SessionState, TrainingOrigin,
    TrainingSession, TrainingSessionInput, TrainingType,
};

/// Activity listed in a plan or program, before it becomes a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDraft {
    /// Display name.
    pub name: String,
    /// Activity kind.
    pub training_type: TrainingType,
    /// Internal or external delivery.
    pub modality: Modality,
    /// Exam policy.
    pub exam: ExamPolicy,
    /// Accepted grade range.
    pub grade_scale: GradeScale,
    /// Whether attendees receive a diploma.
    pub diploma_applies: bool,
    /// Learning objective.
    pub objective: Option<String>,
}

/// Builds one session per draft, each waiting for assignment.
///
/// Sessions start in CREATED and move to PENDING_ASSIGNMENT immediately since
/// no trainer is known yet.
pub fn derive_sessions(
    origin: &TrainingOrigin,
    drafts: Vec<SessionDraft>,
) -> AppResult<Vec<TrainingSession>> {
    drafts
        .into_iter()
        .map(|draft| {
            let mut session = TrainingSession::new(TrainingSessionInput {
                id: SessionId::new(),
                name: draft.name,
                training_type: draft.training_type,
                modality: draft.modality,
                schedule: None,
                trainer: None,
                exam: draft.exam,
                grade_scale: draft.grade_scale,
                diploma_applies: draft.diploma_applies,
                objective: draft.objective,
                observations: None,
                origin: origin.clone(),
                state: SessionState::Created,
                last_review_note: None,
            })?;

            session
                .apply_transition(SessionState::PendingAssignment)
                .map_err(|error| AppError::Internal(error.to_string()))?;

            Ok(session)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use capacita_core::NonEmptyString;

    use super::{SessionDraft, derive_sessions};
    use crate::{
        ExamPolicy, GradeScale, Modality, OriginKind, SessionState, TrainingOrigin, TrainingType,
    };

    fn draft(name: &str) -> SessionDraft {
        SessionDraft {
            name: name.to_owned(),
            training_type: TrainingType::Workshop,
            modality: Modality::Internal,
            exam: ExamPolicy::NotApplicable,
            grade_scale: GradeScale::default(),
            diploma_applies: false,
            objective: Some("  ".to_owned()),
        }
    }

    fn origin() -> TrainingOrigin {
        let Ok(name) = NonEmptyString::new("Plan 2026") else {
            panic!("origin name should be valid");
        };
        TrainingOrigin {
            kind: OriginKind::Plan,
            name,
        }
    }

    #[test]
    fn derived_sessions_wait_for_assignment() {
        let sessions = derive_sessions(&origin(), vec![draft("Fire safety"), draft("First aid")]);
        let Ok(sessions) = sessions else {
            panic!("derivation should succeed");
        };

        assert_eq!(sessions.len(), 2);
        for session in &sessions {
            assert_eq!(session.state(), SessionState::PendingAssignment);
            assert!(session.trainer().is_none());
            assert!(session.objective().is_none());
        }
        assert_ne!(sessions[0].id(), sessions[1].id());
    }

    #[test]
    fn blank_draft_name_fails_derivation() {
        let result = derive_sessions(&origin(), vec![draft("   ")]);
        assert!(result.is_err());
    }
}
