use capacita_core::AppError;
use capacita_domain::{
    FinalizationBlocker, LifecycleError, ParticipantId, ParticipantMutationError, Permission,
    SessionId, SessionState,
};
use thiserror::Error;

/// Result type returned by session commands.
pub type SessionResult<T> = Result<T, SessionError>;

/// Typed failure of a session command. State is unchanged whenever one is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// Requested state is not reachable from the current one.
    #[error("cannot move session from {from} to {to}")]
    InvalidTransition {
        /// Current state.
        from: SessionState,
        /// Requested state.
        to: SessionState,
    },

    /// Finalization rules are not met.
    #[error("session cannot be finalized yet")]
    FinalizationBlocked {
        /// Unmet rules.
        blockers: Vec<FinalizationBlocker>,
    },

    /// Roster change rejected.
    #[error("invalid participant change: {reason}")]
    InvalidParticipantMutation {
        /// Rejected rule.
        reason: String,
    },

    /// Trainer, schedule or participant list cannot be assigned.
    #[error("invalid assignment: {reason}")]
    InvalidAssignment {
        /// Rejected rule.
        reason: String,
    },

    /// Some participants of a bulk roster edit were not saved.
    #[error("{} participant edit(s) were not saved", .failures.len())]
    BulkEditIncomplete {
        /// Each unsaved participant with its failure, in request order.
        failures: Vec<(ParticipantId, SessionError)>,
    },

    /// The acting user holds none of the required permissions.
    #[error("permission denied: requires one of [{}]", join_permissions(.required))]
    PermissionDenied {
        /// Permissions of which one was required.
        required: Vec<Permission>,
    },

    /// Session or participant does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Credential expired or rejected; the user must sign in again.
    #[error("session expired: {0}")]
    SessionExpired(String),

    /// Another transition for the same session has not completed yet.
    #[error("a transition for session {0} is already in flight")]
    TransitionInFlight(SessionId),

    /// Transport failure or backend unavailable.
    #[error("network error: {0}")]
    Network(String),

    /// Structured rejection returned by the backend after re-validation.
    #[error("backend rejected the request ({}): {detail}", .kind.as_str())]
    Rejected {
        /// Rejection category.
        kind: ErrorKind,
        /// Backend-provided detail.
        detail: String,
    },

    /// Any other backend failure.
    #[error(transparent)]
    Backend(AppError),
}

/// Error category exchanged with the backend as `{ kind, detail }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Illegal state jump.
    InvalidTransition,
    /// Roster incomplete.
    FinalizationBlocked,
    /// Bad roster input.
    InvalidParticipantMutation,
    /// Bad assignment input.
    InvalidAssignment,
    /// Authorization failure.
    PermissionDenied,
    /// Missing resource.
    NotFound,
    /// Credential rejected.
    SessionExpired,
    /// Transport failure.
    NetworkError,
    /// Duplicate or conflicting write.
    Conflict,
    /// Unexpected failure.
    Internal,
}

impl ErrorKind {
    /// Returns all categories.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[ErrorKind] = &[
            ErrorKind::InvalidTransition,
            ErrorKind::FinalizationBlocked,
            ErrorKind::InvalidParticipantMutation,
            ErrorKind::InvalidAssignment,
            ErrorKind::PermissionDenied,
            ErrorKind::NotFound,
            ErrorKind::SessionExpired,
            ErrorKind::NetworkError,
            ErrorKind::Conflict,
            ErrorKind::Internal,
        ];

        ALL
    }

    /// Parses the wire value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::all().iter().copied().find(|kind| kind.as_str() == value)
    }

    /// Returns the wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidTransition => "InvalidTransition",
            Self::FinalizationBlocked => "FinalizationBlocked",
            Self::InvalidParticipantMutation => "InvalidParticipantMutation",
            Self::InvalidAssignment => "InvalidAssignment",
            Self::PermissionDenied => "PermissionDenied",
            Self::NotFound => "NotFound",
            Self::SessionExpired => "SessionExpired",
            Self::NetworkError => "NetworkError",
            Self::Conflict => "Conflict",
            Self::Internal => "Internal",
        }
    }
}

/// What the presentation layer should do with a failed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorResolution {
    /// Show the specific rules that are not met.
    ShowUnmetRules(Vec<String>),
    /// Navigate to the access-denied view.
    RedirectAccessDenied,
    /// Drop the credential and return to sign-in.
    ForceLogout,
    /// Offer a retry; local roster edits are kept.
    OfferRetry,
    /// Show a plain message.
    ShowMessage(String),
}

impl SessionError {
    /// Returns the error category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::FinalizationBlocked { .. } => ErrorKind::FinalizationBlocked,
            Self::InvalidParticipantMutation { .. } => ErrorKind::InvalidParticipantMutation,
            Self::InvalidAssignment { .. } => ErrorKind::InvalidAssignment,
            Self::BulkEditIncomplete { failures } => failures
                .first()
                .map_or(ErrorKind::Internal, |(_, error)| error.kind()),
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::SessionExpired(_) => ErrorKind::SessionExpired,
            Self::TransitionInFlight(_) => ErrorKind::Conflict,
            Self::Network(_) => ErrorKind::NetworkError,
            Self::Rejected { kind, .. } => *kind,
            Self::Backend(AppError::Conflict(_)) => ErrorKind::Conflict,
            Self::Backend(_) => ErrorKind::Internal,
        }
    }

    /// Maps the error onto a presentation decision.
    #[must_use]
    pub fn resolution(&self) -> ErrorResolution {
        match self {
            Self::FinalizationBlocked { blockers } => {
                ErrorResolution::ShowUnmetRules(blockers.iter().map(ToString::to_string).collect())
            }
            Self::InvalidParticipantMutation { reason } | Self::InvalidAssignment { reason } => {
                ErrorResolution::ShowUnmetRules(vec![reason.clone()])
            }
            Self::BulkEditIncomplete { failures } => bulk_resolution(failures),
            Self::Rejected {
                kind:
                    ErrorKind::FinalizationBlocked
                    | ErrorKind::InvalidParticipantMutation
                    | ErrorKind::InvalidAssignment,
                detail,
            } => ErrorResolution::ShowUnmetRules(vec![detail.clone()]),
            Self::PermissionDenied { .. }
            | Self::Rejected {
                kind: ErrorKind::PermissionDenied,
                ..
            } => ErrorResolution::RedirectAccessDenied,
            Self::SessionExpired(_) => ErrorResolution::ForceLogout,
            Self::Network(_) => ErrorResolution::OfferRetry,
            other => ErrorResolution::ShowMessage(other.to_string()),
        }
    }

    /// Rebuilds a typed error from a structured backend rejection.
    #[must_use]
    pub fn from_backend_rejection(kind: &str, detail: String) -> Self {
        match ErrorKind::parse(kind) {
            Some(ErrorKind::NotFound) => Self::NotFound(detail),
            Some(ErrorKind::SessionExpired) => Self::SessionExpired(detail),
            Some(ErrorKind::NetworkError) => Self::Network(detail),
            Some(kind) => Self::Rejected { kind, detail },
            None => Self::Backend(AppError::Internal(format!(
                "unknown rejection kind '{kind}': {detail}"
            ))),
        }
    }
}

impl From<AppError> for SessionError {
    fn from(value: AppError) -> Self {
        match value {
            AppError::Unauthorized(detail) => Self::SessionExpired(detail),
            AppError::Forbidden(_) => Self::PermissionDenied {
                required: Vec::new(),
            },
            AppError::NotFound(detail) => Self::NotFound(detail),
            AppError::Network(detail) => Self::Network(detail),
            other => Self::Backend(other),
        }
    }
}

impl From<LifecycleError> for SessionError {
    fn from(value: LifecycleError) -> Self {
        match value {
            LifecycleError::InvalidTransition { from, to } => Self::InvalidTransition { from, to },
            LifecycleError::FinalizationBlocked(blockers) => Self::FinalizationBlocked { blockers },
            LifecycleError::InvalidParticipantMutation(error) => error.into(),
            LifecycleError::InvalidAssignment(reason) => Self::InvalidAssignment { reason },
        }
    }
}

impl From<ParticipantMutationError> for SessionError {
    fn from(value: ParticipantMutationError) -> Self {
        Self::InvalidParticipantMutation {
            reason: value.to_string(),
        }
    }
}

/// An expired credential wins over everything else. Rejected entries are
/// listed per participant; when every entry failed in transit a retry is
/// offered instead.
fn bulk_resolution(failures: &[(ParticipantId, SessionError)]) -> ErrorResolution {
    if failures
        .iter()
        .any(|(_, error)| matches!(error, SessionError::SessionExpired(_)))
    {
        return ErrorResolution::ForceLogout;
    }

    if failures
        .iter()
        .all(|(_, error)| matches!(error, SessionError::Network(_)))
    {
        return ErrorResolution::OfferRetry;
    }

    ErrorResolution::ShowUnmetRules(
        failures
            .iter()
            .map(|(participant_id, error)| format!("participant {participant_id}: {error}"))
            .collect(),
    )
}

fn join_permissions(permissions: &[Permission]) -> String {
    permissions
        .iter()
        .map(Permission::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
