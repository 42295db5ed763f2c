use std::sync::Arc;

use capacita_domain::{Permission, UserAccess, has_access};
use tracing::debug;

use crate::{AccessBackend, SessionError, SessionResult};

mod screens;
mod transitions;

#[cfg(test)]
mod tests;

pub use transitions::RosterCommand;

/// Application service for console authorization checks.
///
/// Every check evaluates the user snapshot locally; the backend is only
/// contacted to load that snapshot.
#[derive(Clone)]
pub struct AuthorizationService {
    backend: Arc<dyn AccessBackend>,
}

impl AuthorizationService {
    /// Creates a new authorization service from a backend implementation.
    #[must_use]
    pub fn new(backend: Arc<dyn AccessBackend>) -> Self {
        Self { backend }
    }

    /// Loads the signed-in user.
    pub async fn current_user(&self) -> SessionResult<UserAccess> {
        let user = self.backend.current_user().await?;
        debug!(
            subject = %user.identity().subject(),
            roles = user.roles().len(),
            "loaded user access snapshot"
        );

        Ok(user)
    }

    /// Ensures the user holds at least one of the required permissions.
    ///
    /// An empty requirement only needs an authenticated user.
    pub fn require_any(user: Option<&UserAccess>, required: &[Permission]) -> SessionResult<()> {
        if user.is_none() {
            return Err(SessionError::SessionExpired(
                "no signed-in user".to_owned(),
            ));
        }

        if has_access(user, required) {
            return Ok(());
        }

        Err(SessionError::PermissionDenied {
            required: required.to_vec(),
        })
    }
}
