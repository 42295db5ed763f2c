use std::fmt;
use std::sync::Arc;

use capacita_core::{AppError, AppResult};
use tokio::sync::RwLock;

/// Bearer credential shared by every backend request.
///
/// Clones share the same slot, so clearing it after a rejected credential
/// signs out every adapter at once.
#[derive(Clone, Default)]
pub struct CredentialStore {
    token: Arc<RwLock<Option<String>>>,
}

impl CredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given token.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(Some(token.into()))),
        }
    }

    /// Replaces the stored token.
    pub async fn set_token(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }

    /// Returns the token, failing fast when nobody is signed in.
    pub async fn bearer(&self) -> AppResult<String> {
        self.token
            .read()
            .await
            .clone()
            .ok_or_else(|| AppError::Unauthorized("no credential is stored".to_owned()))
    }

    /// Drops the token.
    pub async fn clear(&self) {
        self.token.write().await.take();
    }

    /// Returns whether a token is stored.
    pub async fn is_signed_in(&self) -> bool {
        self.token.read().await.is_some()
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CredentialStore")
            .field("token", &"<redacted>")
            .finish()
    }
}
