use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use capacita_domain::{Screen, SessionId, UserAccess};
use tracing::{debug, warn};

use crate::{
    AuthorizationService, SessionError, SessionResult, SessionSnapshot, SessionWorkspace,
    TrainingBackend,
};

mod roster;
mod transitions;


/// Application service driving session commands against the backend.
///
/// Every command is checked locally first: permissions, then lifecycle rules,
/// then the completion gate. Only commands that pass all of them reach the
/// backend, which re-validates before persisting.
#[derive(Clone)]
pub struct SessionOrchestrator {
    backend: Arc<dyn TrainingBackend>,
    in_flight: Arc<Mutex<HashSet<SessionId>>>,
}

impl SessionOrchestrator {
    /// Creates a new orchestrator from a backend implementation.
    #[must_use]
    pub fn new(backend: Arc<dyn TrainingBackend>) -> Self {
        Self {
            backend,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Loads a session into a fresh workspace.
    pub async fn open_session(
        &self,
        user: Option<&UserAccess>,
        session_id: SessionId,
    ) -> SessionResult<SessionWorkspace> {
        AuthorizationService::require_any(user, Screen::TrainingSession.required_permissions())?;

        let snapshot = self.backend.fetch_session(session_id).await?;
        debug!(
            session_id = %session_id,
            state = snapshot.session.state().as_str(),
            participants = snapshot.roster.len(),
            "opened training session"
        );

        Ok(SessionWorkspace::new(snapshot))
    }

    /// Reloads the workspace from the backend, dropping unsynced edits.
    pub async fn refresh(&self, workspace: &mut SessionWorkspace) -> SessionResult<()> {
        let session_id = workspace.session().id();
        let snapshot: SessionSnapshot = self.backend.fetch_session(session_id).await?;
        if workspace.has_pending_edits() {
            warn!(
                session_id = %session_id,
                dropped = workspace.pending_participants().len(),
                "refresh discarded unsynced roster edits"
            );
        }

        workspace.replace_snapshot(snapshot);
        Ok(())
    }

    fn begin_transition(&self, session_id: SessionId) -> SessionResult<InFlightGuard> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

        if !in_flight.insert(session_id) {
            return Err(SessionError::TransitionInFlight(session_id));
        }

        Ok(InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            session_id,
        })
    }
}

/// Releases the in-flight marker when the transition completes or fails.
struct InFlightGuard {
    in_flight: Arc<Mutex<HashSet<SessionId>>>,
    session_id: SessionId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.session_id);
    }
}
