use std::sync::Arc;

use async_trait::async_trait;
use capacita_domain::{Permission, Screen, SessionState, UserAccess};
use tokio::sync::Mutex;

use crate::test_support::user_with;
use crate::{AccessBackend, SessionError, SessionResult};

use super::{AuthorizationService, RosterCommand};

struct FakeAccessBackend {
    user: SessionResult<UserAccess>,
    calls: Mutex<u32>,
}

#[async_trait]
impl AccessBackend for FakeAccessBackend {
    async fn current_user(&self) -> SessionResult<UserAccess> {
        *self.calls.lock().await += 1;
        self.user.clone()
    }
}

fn service(user: SessionResult<UserAccess>) -> (AuthorizationService, Arc<FakeAccessBackend>) {
    let backend = Arc::new(FakeAccessBackend {
        user,
        calls: Mutex::new(0),
    });
    (AuthorizationService::new(backend.clone()), backend)
}

#[test]
fn view_only_user_cannot_manage_trainings() {
    let user = user_with(&[Permission::ViewTrainings]);
    let result = AuthorizationService::require_any(Some(&user), &[Permission::ManageTrainings]);

    assert_eq!(
        result,
        Err(SessionError::PermissionDenied {
            required: vec![Permission::ManageTrainings],
        })
    );
}

#[test]
fn missing_user_is_treated_as_expired_session() {
    let result = AuthorizationService::require_any(None, &[]);
    assert!(matches!(result, Err(SessionError::SessionExpired(_))));
}

#[test]
fn approval_requires_review_permission() {
    let trainer = user_with(&[Permission::RunTrainings, Permission::ManageTrainings]);
    let hr = user_with(&[Permission::ReviewTrainings]);

    assert!(
        AuthorizationService::require_transition(
            Some(&trainer),
            SessionState::UnderReview,
            SessionState::Finalized,
        )
        .is_err()
    );
    assert!(
        AuthorizationService::require_transition(
            Some(&hr),
            SessionState::UnderReview,
            SessionState::Finalized,
        )
        .is_ok()
    );
}

#[test]
fn illegal_pair_uses_permissions_of_edges_into_target() {
    let required = AuthorizationService::transition_permissions(
        SessionState::Finalized,
        SessionState::InProgress,
    );

    assert!(required.contains(&Permission::RunTrainings));
    assert!(required.contains(&Permission::ManageTrainings));
    assert!(required.contains(&Permission::ReviewTrainings));
    assert!(
        AuthorizationService::transition_permissions(
            SessionState::Finalized,
            SessionState::Created
        )
        .is_empty()
    );
}

#[test]
fn diploma_changes_accept_document_managers() {
    let documents = user_with(&[Permission::ManageDocuments]);

    assert!(
        AuthorizationService::require_roster_command(Some(&documents), RosterCommand::Diploma)
            .is_ok()
    );
    assert!(
        AuthorizationService::require_roster_command(Some(&documents), RosterCommand::Mark)
            .is_err()
    );
}

#[tokio::test]
async fn accessible_screens_follow_loaded_user() {
    let (service, backend) = service(Ok(user_with(&[Permission::ManageRoles])));

    let screens = service.resolve_accessible_screens().await;

    let Ok(screens) = screens else {
        panic!("screens should resolve");
    };
    assert_eq!(screens, vec![Screen::Dashboard, Screen::Roles]);
    assert_eq!(*backend.calls.lock().await, 1);
}

#[tokio::test]
async fn require_screen_denies_missing_permission() {
    let (service, _) = service(Ok(user_with(&[Permission::ViewEmployees])));

    let result = service.require_screen(Screen::Reviews).await;

    assert!(matches!(
        result,
        Err(SessionError::PermissionDenied { .. })
    ));
}

#[tokio::test]
async fn expired_credential_propagates() {
    let (service, _) = service(Err(SessionError::SessionExpired("401".to_owned())));

    let result = service.resolve_accessible_screens().await;

    assert!(matches!(result, Err(SessionError::SessionExpired(_))));
}
