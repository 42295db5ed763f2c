use std::fmt::{Display, Formatter};
use std::str::FromStr;

use capacita_core::AppError;
use serde::{Deserialize, Serialize};

use crate::{LifecycleError, Permission};

/// Lifecycle state of a training session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Derived from a plan or program, not yet queued for assignment.
    Created,
    /// Waiting for trainer, schedule and participants.
    PendingAssignment,
    /// Trainer, schedule and participants are set.
    Assigned,
    /// The trainer started the session.
    InProgress,
    /// The trainer finalized the session.
    FinalizedByTrainer,
    /// Queued for HR review.
    UnderReview,
    /// Approved by HR.
    Finalized,
    /// Cancelled before completion.
    Cancelled,
}

impl SessionState {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::PendingAssignment => "PENDING_ASSIGNMENT",
            Self::Assigned => "ASSIGNED",
            Self::InProgress => "IN_PROGRESS",
            Self::FinalizedByTrainer => "FINALIZED_BY_TRAINER",
            Self::UnderReview => "UNDER_REVIEW",
            Self::Finalized => "FINALIZED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Returns all states in lifecycle order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[SessionState] = &[
            SessionState::Created,
            SessionState::PendingAssignment,
            SessionState::Assigned,
            SessionState::InProgress,
            SessionState::FinalizedByTrainer,
            SessionState::UnderReview,
            SessionState::Finalized,
            SessionState::Cancelled,
        ];

        ALL
    }

    /// Returns whether no transition leaves this state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized | Self::Cancelled)
    }

    /// Returns whether participants may be added or removed.
    #[must_use]
    pub fn accepts_enrolment(&self) -> bool {
        matches!(self, Self::PendingAssignment | Self::Assigned)
    }

    /// Returns whether attendance, grades and exams may be recorded.
    #[must_use]
    pub fn accepts_marks(&self) -> bool {
        *self == Self::InProgress
    }

    /// Returns whether diplomas may be attached or removed.
    ///
    /// Diplomas are not part of the completion gate and may follow until approval.
    #[must_use]
    pub fn accepts_diplomas(&self) -> bool {
        matches!(
            self,
            Self::InProgress | Self::FinalizedByTrainer | Self::UnderReview | Self::Finalized
        )
    }

    /// Returns the states reachable in one legal transition.
    #[must_use]
    pub fn allowed_targets(&self) -> &'static [Self] {
        match self {
            Self::Created => &[Self::PendingAssignment],
            Self::PendingAssignment => &[Self::Assigned, Self::Cancelled],
            Self::Assigned => &[Self::InProgress, Self::Cancelled],
            Self::InProgress => &[Self::FinalizedByTrainer, Self::Cancelled],
            Self::FinalizedByTrainer => &[Self::UnderReview],
            Self::UnderReview => &[Self::Finalized, Self::InProgress],
            Self::Finalized | Self::Cancelled => &[],
        }
    }

    /// Returns whether moving to `target` is a legal transition.
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        self.allowed_targets().contains(&target)
    }

    /// Classifies the move to `target`, rejecting anything outside the table.
    pub fn transition_to(&self, target: Self) -> Result<TransitionKind, LifecycleError> {
        TransitionKind::classify(*self, target).ok_or(LifecycleError::InvalidTransition {
            from: *self,
            to: target,
        })
    }
}

impl Display for SessionState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for SessionState {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|state| state.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown session state '{value}'")))
    }
}

/// Named edge of the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    /// CREATED to PENDING_ASSIGNMENT, right after derivation.
    AwaitAssignment,
    /// PENDING_ASSIGNMENT to ASSIGNED.
    Assign,
    /// ASSIGNED to IN_PROGRESS.
    Start,
    /// IN_PROGRESS to FINALIZED_BY_TRAINER, gated by the roster.
    Finalize,
    /// FINALIZED_BY_TRAINER to UNDER_REVIEW.
    QueueForReview,
    /// UNDER_REVIEW to FINALIZED.
    Approve,
    /// UNDER_REVIEW back to IN_PROGRESS.
    Reject,
    /// Any cancellable state to CANCELLED.
    Cancel,
}

impl TransitionKind {
    /// Maps a `(from, to)` pair onto its edge, if the pair is legal.
    #[must_use]
    pub fn classify(from: SessionState, to: SessionState) -> Option<Self> {
        use SessionState as S;

        match (from, to) {
            (S::Created, S::PendingAssignment) => Some(Self::AwaitAssignment),
            (S::PendingAssignment, S::Assigned) => Some(Self::Assign),
            (S::Assigned, S::InProgress) => Some(Self::Start),
            (S::InProgress, S::FinalizedByTrainer) => Some(Self::Finalize),
            (S::FinalizedByTrainer, S::UnderReview) => Some(Self::QueueForReview),
            (S::UnderReview, S::Finalized) => Some(Self::Approve),
            (S::UnderReview, S::InProgress) => Some(Self::Reject),
            (S::PendingAssignment | S::Assigned | S::InProgress, S::Cancelled) => {
                Some(Self::Cancel)
            }
            _ => None,
        }
    }

    /// Returns a stable label used in logs and audit trails.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitAssignment => "await_assignment",
            Self::Assign => "assign",
            Self::Start => "start",
            Self::Finalize => "finalize",
            Self::QueueForReview => "queue_for_review",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Cancel => "cancel",
        }
    }

    /// Returns the permissions of which the acting user needs at least one.
    #[must_use]
    pub fn required_permissions(&self) -> &'static [Permission] {
        match self {
            Self::AwaitAssignment | Self::Assign | Self::Cancel => &[Permission::ManageTrainings],
            Self::Start | Self::QueueForReview => {
                &[Permission::RunTrainings, Permission::ManageTrainings]
            }
            Self::Finalize => &[Permission::RunTrainings],
            Self::Approve | Self::Reject => &[Permission::ReviewTrainings],
        }
    }
}

impl Display for TransitionKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}
