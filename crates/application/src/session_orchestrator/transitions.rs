use capacita_domain::{SessionAssignment, SessionState, TransitionKind};
use tracing::info;

use crate::TransitionCommand;

use super::*;

impl SessionOrchestrator {
    /// Requests a lifecycle transition for the workspace session.
    ///
    /// Checks run in order: permission, state table legality, completion gate
    /// (finalize only). Unsynced roster edits are pushed before the backend
    /// commit. A successful finalize is queued for HR review automatically.
    pub async fn request_transition(
        &self,
        workspace: &mut SessionWorkspace,
        target: SessionState,
        user: Option<&UserAccess>,
    ) -> SessionResult<SessionState> {
        self.transition(workspace, target, user, None).await
    }

    /// Returns a session under review to its trainer, recording the reason.
    pub async fn return_to_trainer(
        &self,
        workspace: &mut SessionWorkspace,
        user: Option<&UserAccess>,
        reason: impl Into<String>,
    ) -> SessionResult<SessionState> {
        self.transition(workspace, SessionState::InProgress, user, Some(reason.into()))
            .await
    }

    /// Assigns trainer, schedule and participants to a pending session.
    pub async fn assign(
        &self,
        workspace: &mut SessionWorkspace,
        user: Option<&UserAccess>,
        assignment: SessionAssignment,
    ) -> SessionResult<SessionState> {
        let session_id = workspace.session().id();
        let from = workspace.session().state();
        AuthorizationService::require_transition(user, from, SessionState::Assigned)?;

        let mut candidate = workspace.session().clone();
        candidate.assign(assignment.clone())?;

        let _guard = self.begin_transition(session_id)?;
        let participants = assignment.participants.len();
        let snapshot = self
            .backend
            .assign_session(session_id, assignment)
            .await
            .inspect_err(|error| {
                warn!(session_id = %session_id, error = %error, "session assignment failed");
            })?;

        let state = snapshot.session.state();
        workspace.replace_snapshot(snapshot);
        info!(
            session_id = %session_id,
            from = %from,
            to = %state,
            participants,
            "session assigned"
        );

        Ok(state)
    }

    async fn transition(
        &self,
        workspace: &mut SessionWorkspace,
        target: SessionState,
        user: Option<&UserAccess>,
        reason: Option<String>,
    ) -> SessionResult<SessionState> {
        let session_id = workspace.session().id();
        let from = workspace.session().state();
        AuthorizationService::require_transition(user, from, target)?;

        let mut candidate = workspace.session().clone();
        let kind = candidate.apply_transition(target)?;

        if kind == TransitionKind::Finalize {
            ensure_finalizable(workspace)?;
        }

        let _guard = self.begin_transition(session_id)?;

        if workspace.has_pending_edits() {
            self.sync_pending(workspace).await?;
            if kind == TransitionKind::Finalize {
                ensure_finalizable(workspace)?;
            }
        }

        let command = TransitionCommand {
            target_state: target,
            reason: reason.filter(|_| kind == TransitionKind::Reject),
        };
        let session = self
            .backend
            .commit_transition(session_id, command)
            .await
            .inspect_err(|error| {
                warn!(
                    session_id = %session_id,
                    from = %from,
                    to = %target,
                    error = %error,
                    "session transition failed"
                );
            })?;

        let committed = session.state();
        workspace.replace_session(session);
        info!(
            session_id = %session_id,
            from = %from,
            to = %committed,
            transition = kind.as_str(),
            "session transition committed"
        );

        if kind == TransitionKind::Finalize && committed == SessionState::FinalizedByTrainer {
            return Ok(self.queue_for_review(workspace).await);
        }

        Ok(committed)
    }

    /// Moves a trainer-finalized session into HR review.
    ///
    /// The finalize itself already succeeded, so a failure here is logged and
    /// the session stays in FINALIZED_BY_TRAINER.
    async fn queue_for_review(&self, workspace: &mut SessionWorkspace) -> SessionState {
        let session_id = workspace.session().id();
        let command = TransitionCommand {
            target_state: SessionState::UnderReview,
            reason: None,
        };

        match self.backend.commit_transition(session_id, command).await {
            Ok(session) => {
                let state = session.state();
                workspace.replace_session(session);
                info!(session_id = %session_id, to = %state, "session queued for review");
                state
            }
            Err(error) => {
                warn!(
                    session_id = %session_id,
                    error = %error,
                    "session finalized but could not be queued for review"
                );
                workspace.session().state()
            }
        }
    }
}

fn ensure_finalizable(workspace: &SessionWorkspace) -> SessionResult<()> {
    let check = workspace.finalization_check();
    if check.is_ready() {
        return Ok(());
    }

    warn!(
        session_id = %workspace.session().id(),
        blockers = check.blockers().len(),
        "finalization blocked"
    );
    Err(SessionError::FinalizationBlocked {
        blockers: check.into_blockers(),
    })
}
