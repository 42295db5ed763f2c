use capacita_domain::{SessionState, TransitionKind};

use super::*;

/// Roster change categories with distinct permission requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RosterCommand {
    /// Attendance, grade, exam and observations.
    Mark,
    /// Diploma attach and removal.
    Diploma,
    /// Adding or removing participants.
    Enrolment,
}

impl RosterCommand {
    /// Returns the permissions of which the acting user needs at least one.
    #[must_use]
    pub fn required_permissions(&self) -> &'static [Permission] {
        match self {
            Self::Mark => &[Permission::RunTrainings],
            Self::Diploma => &[Permission::RunTrainings, Permission::ManageDocuments],
            Self::Enrolment => &[Permission::ManageTrainings],
        }
    }
}

impl AuthorizationService {
    /// Returns the permissions required to request `to` from `from`.
    ///
    /// Legal edges use their own requirement. For illegal pairs the user needs
    /// a permission of any edge leading into `to`, so that unauthorized users
    /// learn nothing about the session's state.
    #[must_use]
    pub fn transition_permissions(from: SessionState, to: SessionState) -> Vec<Permission> {
        if let Some(kind) = TransitionKind::classify(from, to) {
            return kind.required_permissions().to_vec();
        }

        let mut required: Vec<Permission> = Vec::new();
        for source in SessionState::all() {
            if let Some(kind) = TransitionKind::classify(*source, to) {
                for permission in kind.required_permissions() {
                    if !required.contains(permission) {
                        required.push(*permission);
                    }
                }
            }
        }

        required
    }

    /// Ensures the user may request the transition.
    pub fn require_transition(
        user: Option<&UserAccess>,
        from: SessionState,
        to: SessionState,
    ) -> SessionResult<()> {
        Self::require_any(user, &Self::transition_permissions(from, to))
    }

    /// Ensures the user may apply the roster change.
    pub fn require_roster_command(
        user: Option<&UserAccess>,
        command: RosterCommand,
    ) -> SessionResult<()> {
        Self::require_any(user, command.required_permissions())
    }
}
