use std::collections::HashMap;

use async_trait::async_trait;
use capacita_application::{
    AccessBackend, AuthorizationService, ParticipantPatch, RosterCommand, SessionError,
    SessionResult, SessionSnapshot, TrainingBackend, TransitionCommand,
};
use capacita_core::{AppError, AppResult};
use capacita_domain::{
    ParticipantId, ParticipantMutationError, ParticipantRecord, Screen, SessionAssignment,
    SessionId, SessionState, TrainingSession, TransitionKind, UserAccess, evaluate_finalization,
};
use tokio::sync::RwLock;
use tracing::info;


/// In-memory system of record for training sessions.
///
/// Re-validates every command against the signed-in user, the state table,
/// the completion gate and the roster rules, the same way the remote backend
/// does. Backs the end-to-end lifecycle tests.
#[derive(Debug, Default)]
pub struct InMemoryTrainingBackend {
    sessions: RwLock<HashMap<SessionId, SessionSnapshot>>,
    current_user: RwLock<Option<UserAccess>>,
}

impl InMemoryTrainingBackend {
    /// Creates an empty backend with nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            current_user: RwLock::new(None),
        }
    }

    /// Stores a new session.
    pub async fn save_session(&self, snapshot: SessionSnapshot) -> AppResult<()> {
        let session_id = snapshot.session.id();
        let mut sessions = self.sessions.write().await;

        if sessions.contains_key(&session_id) {
            return Err(AppError::Conflict(format!(
                "session '{session_id}' already exists"
            )));
        }

        sessions.insert(session_id, snapshot);
        Ok(())
    }

    /// Lists stored sessions ordered by name.
    pub async fn list_sessions(&self) -> Vec<TrainingSession> {
        let sessions = self.sessions.read().await;

        let mut values: Vec<TrainingSession> = sessions
            .values()
            .map(|snapshot| snapshot.session.clone())
            .collect();
        values.sort_by(|left, right| left.name().as_str().cmp(right.name().as_str()));

        values
    }

    /// Signs a user in; subsequent commands act on their behalf.
    pub async fn sign_in(&self, user: UserAccess) {
        *self.current_user.write().await = Some(user);
    }

    /// Signs the current user out.
    pub async fn sign_out(&self) {
        self.current_user.write().await.take();
    }

    async fn acting_user(&self) -> SessionResult<UserAccess> {
        self.current_user
            .read()
            .await
            .clone()
            .ok_or_else(|| SessionError::SessionExpired("no signed-in user".to_owned()))
    }
}

fn not_found(session_id: SessionId) -> SessionError {
    SessionError::NotFound(format!("session '{session_id}'"))
}

fn stored_record(
    snapshot: &SessionSnapshot,
    participant_id: ParticipantId,
) -> SessionResult<ParticipantRecord> {
    snapshot
        .roster
        .get(participant_id)
        .cloned()
        .ok_or_else(|| ParticipantMutationError::UnknownParticipant(participant_id).into())
}

#[async_trait]
impl TrainingBackend for InMemoryTrainingBackend {
    async fn fetch_session(&self, session_id: SessionId) -> SessionResult<SessionSnapshot> {
        let user = self.acting_user().await?;
        AuthorizationService::require_any(
            Some(&user),
            Screen::TrainingSession.required_permissions(),
        )?;

        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or_else(|| not_found(session_id))
    }

    async fn commit_transition(
        &self,
        session_id: SessionId,
        command: TransitionCommand,
    ) -> SessionResult<TrainingSession> {
        let user = self.acting_user().await?;
        let mut sessions = self.sessions.write().await;
        let snapshot = sessions
            .get_mut(&session_id)
            .ok_or_else(|| not_found(session_id))?;

        let from = snapshot.session.state();
        AuthorizationService::require_transition(Some(&user), from, command.target_state)?;

        let mut session = snapshot.session.clone();
        let kind = session.apply_transition(command.target_state)?;
        if kind == TransitionKind::Finalize {
            let check = evaluate_finalization(&snapshot.session, &snapshot.roster);
            if !check.is_ready() {
                return Err(SessionError::FinalizationBlocked {
                    blockers: check.into_blockers(),
                });
            }
        }
        if kind == TransitionKind::Reject {
            session.set_review_note(command.reason);
        }

        snapshot.session = session.clone();
        info!(
            session_id = %session_id,
            from = %from,
            to = %command.target_state,
            subject = %user.identity().subject(),
            "stored session transition"
        );

        Ok(session)
    }

    async fn assign_session(
        &self,
        session_id: SessionId,
        assignment: SessionAssignment,
    ) -> SessionResult<SessionSnapshot> {
        let user = self.acting_user().await?;
        let mut sessions = self.sessions.write().await;
        let snapshot = sessions
            .get_mut(&session_id)
            .ok_or_else(|| not_found(session_id))?;

        AuthorizationService::require_transition(
            Some(&user),
            snapshot.session.state(),
            SessionState::Assigned,
        )?;

        let mut session = snapshot.session.clone();
        let roster = session.assign(assignment)?;
        *snapshot = SessionSnapshot { session, roster };
        info!(
            session_id = %session_id,
            participants = snapshot.roster.len(),
            "stored session assignment"
        );

        Ok(snapshot.clone())
    }

    async fn patch_participant(
        &self,
        session_id: SessionId,
        participant_id: ParticipantId,
        patch: ParticipantPatch,
    ) -> SessionResult<ParticipantRecord> {
        let user = self.acting_user().await?;
        AuthorizationService::require_roster_command(Some(&user), patch.roster_command())?;

        let mut sessions = self.sessions.write().await;
        let snapshot = sessions
            .get_mut(&session_id)
            .ok_or_else(|| not_found(session_id))?;

        patch.ensure_allowed_in(snapshot.session.state())?;
        patch.apply_to(&mut snapshot.roster, participant_id)?;

        stored_record(snapshot, participant_id)
    }

    async fn add_participant(
        &self,
        session_id: SessionId,
        participant_id: ParticipantId,
    ) -> SessionResult<ParticipantRecord> {
        let user = self.acting_user().await?;
        AuthorizationService::require_roster_command(Some(&user), RosterCommand::Enrolment)?;

        let mut sessions = self.sessions.write().await;
        let snapshot = sessions
            .get_mut(&session_id)
            .ok_or_else(|| not_found(session_id))?;

        let state = snapshot.session.state();
        if !state.accepts_enrolment() {
            return Err(ParticipantMutationError::NotAllowedInState(state).into());
        }
        snapshot.roster.add_participant(participant_id)?;

        stored_record(snapshot, participant_id)
    }

    async fn remove_participant(
        &self,
        session_id: SessionId,
        participant_id: ParticipantId,
    ) -> SessionResult<()> {
        let user = self.acting_user().await?;
        AuthorizationService::require_roster_command(Some(&user), RosterCommand::Enrolment)?;

        let mut sessions = self.sessions.write().await;
        let snapshot = sessions
            .get_mut(&session_id)
            .ok_or_else(|| not_found(session_id))?;

        let state = snapshot.session.state();
        if !state.accepts_enrolment() {
            return Err(ParticipantMutationError::NotAllowedInState(state).into());
        }
        snapshot.roster.remove_participant(participant_id)?;

        Ok(())
    }
}

#[async_trait]
impl AccessBackend for InMemoryTrainingBackend {
    async fn current_user(&self) -> SessionResult<UserAccess> {
        self.acting_user().await
    }
}
