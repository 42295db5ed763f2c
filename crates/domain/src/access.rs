use std::collections::BTreeSet;

use capacita_core::UserIdentity;

use crate::{PermissionKey, Role, Screen};

/// Snapshot of the signed-in user and the roles they hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccess {
    identity: UserIdentity,
    roles: Vec<Role>,
    effective_permissions: BTreeSet<PermissionKey>,
}

impl UserAccess {
    /// Creates a snapshot and resolves the effective permission set.
    #[must_use]
    pub fn new(identity: UserIdentity, roles: Vec<Role>) -> Self {
        let effective_permissions = roles
            .iter()
            .flat_map(|role| role.permissions().iter().cloned())
            .collect();

        Self {
            identity,
            roles,
            effective_permissions,
        }
    }

    /// Returns the user identity.
    #[must_use]
    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    /// Returns the roles held by the user.
    #[must_use]
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Returns the union of keys granted by all roles.
    #[must_use]
    pub fn effective_permissions(&self) -> &BTreeSet<PermissionKey> {
        &self.effective_permissions
    }

    /// Returns whether any role grants the key.
    #[must_use]
    pub fn has_permission(&self, key: &str) -> bool {
        self.effective_permissions.contains(key)
    }
}

/// Decides whether the user may open a screen or trigger an action.
///
/// Access is granted when `required` is empty or when the user holds at least
/// one of the required keys. A missing user never has access.
#[must_use]
pub fn has_access<K>(user: Option<&UserAccess>, required: &[K]) -> bool
where
    K: AsRef<str>,
{
    let Some(user) = user else {
        return false;
    };

    if required.is_empty() {
        return true;
    }

    required
        .iter()
        .any(|key| user.has_permission(key.as_ref()))
}

/// Returns the screens the user may open, in navigation order.
#[must_use]
pub fn accessible_screens(user: Option<&UserAccess>) -> Vec<Screen> {
    Screen::all()
        .iter()
        .copied()
        .filter(|screen| has_access(user, screen.required_permissions()))
        .collect()
}
