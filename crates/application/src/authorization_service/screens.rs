use capacita_domain::{Screen, accessible_screens};

use super::*;

impl AuthorizationService {
    /// Returns the screens the signed-in user may open.
    ///
    /// A screen is accessible when the user holds at least one of the
    /// permissions it requires (logical OR).
    pub async fn resolve_accessible_screens(&self) -> SessionResult<Vec<Screen>> {
        let user = self.current_user().await?;
        Ok(accessible_screens(Some(&user)))
    }

    /// Loads the user and ensures they may open the screen.
    pub async fn require_screen(&self, screen: Screen) -> SessionResult<UserAccess> {
        let user = self.current_user().await?;
        Self::require_any(Some(&user), screen.required_permissions())?;
        Ok(user)
    }
}
