use async_trait::async_trait;
use capacita_application::{
    AccessBackend, ParticipantPatch, SessionError, SessionResult, SessionSnapshot,
    TrainingBackend, TransitionCommand,
};
use capacita_core::AppError;
use capacita_domain::{
    GradeScale, ParticipantId, ParticipantRecord, SessionAssignment, SessionId, TrainingSession,
    UserAccess,
};
use reqwest::{StatusCode, header};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::CredentialStore;
use crate::wire::{
    AddParticipantRequest, AssignmentRequest, CurrentUserResponse, ErrorResponse,
    ParticipantPatchRequest, ParticipantResponse, SessionResponse, SessionSnapshotResponse,
    TransitionRequest,
};


/// REST adapter for the training backend.
///
/// Every request carries the stored bearer credential. A 401 clears it and
/// surfaces as an expired session. Transport failures and timeouts are
/// reported as network errors and never retried here.
#[derive(Debug, Clone)]
pub struct HttpTrainingBackend {
    http_client: reqwest::Client,
    base_url: String,
    credentials: CredentialStore,
    grade_scale: GradeScale,
}

impl HttpTrainingBackend {
    /// Creates a new adapter. `base_url` is the API root, e.g. `http://host/api`.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        base_url: impl Into<String>,
        credentials: CredentialStore,
        grade_scale: GradeScale,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            credentials,
            grade_scale,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> SessionResult<reqwest::Response> {
        let token = self.credentials.bearer().await?;
        let response = request
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await
            .map_err(|error| {
                warn!(operation, error = %error, "training backend unreachable");
                SessionError::Network(format!("failed to call {operation}: {error}"))
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(operation, status = status.as_u16(), "training backend call succeeded");
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            self.credentials.clear().await;
            warn!(operation, "credential rejected; signing out");
            return Err(SessionError::SessionExpired(format!(
                "{operation} was rejected with status 401"
            )));
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<body unavailable>".to_owned());
        warn!(operation, status = status.as_u16(), "training backend rejected request");

        Err(rejection(status, &body))
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
        operation: &'static str,
    ) -> SessionResult<T> {
        response.json::<T>().await.map_err(|error| {
            SessionError::Backend(AppError::Internal(format!(
                "failed to parse {operation} response body: {error}"
            )))
        })
    }
}

/// Rebuilds a typed error from a non-success response.
fn rejection(status: StatusCode, body: &str) -> SessionError {
    if let Ok(error) = serde_json::from_str::<ErrorResponse>(body) {
        return SessionError::from_backend_rejection(&error.kind, error.detail);
    }

    let detail = format!("status {}: {body}", status.as_u16());
    match status {
        StatusCode::FORBIDDEN => SessionError::PermissionDenied {
            required: Vec::new(),
        },
        StatusCode::NOT_FOUND => SessionError::NotFound(detail),
        StatusCode::CONFLICT => SessionError::Backend(AppError::Conflict(detail)),
        StatusCode::UNPROCESSABLE_ENTITY => {
            SessionError::InvalidParticipantMutation { reason: detail }
        }
        status if status.is_server_error() => SessionError::Network(detail),
        _ => SessionError::Backend(AppError::Internal(detail)),
    }
}

#[async_trait]
impl TrainingBackend for HttpTrainingBackend {
    async fn fetch_session(&self, session_id: SessionId) -> SessionResult<SessionSnapshot> {
        let operation = "fetch session";
        let request = self
            .http_client
            .get(self.endpoint(&format!("/sessions/{session_id}")));
        let response = self.send(request, operation).await?;
        let body: SessionSnapshotResponse = Self::decode(response, operation).await?;

        Ok(body.into_domain(self.grade_scale)?)
    }

    async fn commit_transition(
        &self,
        session_id: SessionId,
        command: TransitionCommand,
    ) -> SessionResult<TrainingSession> {
        let operation = "commit transition";
        let request = self
            .http_client
            .patch(self.endpoint(&format!("/sessions/{session_id}/state")))
            .json(&TransitionRequest {
                target_state: command.target_state,
                reason: command.reason,
            });
        let response = self.send(request, operation).await?;
        let body: SessionResponse = Self::decode(response, operation).await?;

        Ok(body.into_domain(self.grade_scale)?)
    }

    async fn assign_session(
        &self,
        session_id: SessionId,
        assignment: SessionAssignment,
    ) -> SessionResult<SessionSnapshot> {
        let operation = "assign session";
        let request = self
            .http_client
            .put(self.endpoint(&format!("/sessions/{session_id}/assignment")))
            .json(&AssignmentRequest::from(&assignment));
        let response = self.send(request, operation).await?;
        let body: SessionSnapshotResponse = Self::decode(response, operation).await?;

        Ok(body.into_domain(self.grade_scale)?)
    }

    async fn patch_participant(
        &self,
        session_id: SessionId,
        participant_id: ParticipantId,
        patch: ParticipantPatch,
    ) -> SessionResult<ParticipantRecord> {
        let operation = "patch participant";
        let request = self
            .http_client
            .patch(self.endpoint(&format!(
                "/sessions/{session_id}/participants/{participant_id}"
            )))
            .json(&ParticipantPatchRequest::from(&patch));
        let response = self.send(request, operation).await?;
        let body: ParticipantResponse = Self::decode(response, operation).await?;

        Ok(body.into_domain(self.grade_scale)?)
    }

    async fn add_participant(
        &self,
        session_id: SessionId,
        participant_id: ParticipantId,
    ) -> SessionResult<ParticipantRecord> {
        let operation = "add participant";
        let request = self
            .http_client
            .post(self.endpoint(&format!("/sessions/{session_id}/participants")))
            .json(&AddParticipantRequest {
                participant_id: participant_id.as_uuid(),
            });
        let response = self.send(request, operation).await?;
        let body: ParticipantResponse = Self::decode(response, operation).await?;

        Ok(body.into_domain(self.grade_scale)?)
    }

    async fn remove_participant(
        &self,
        session_id: SessionId,
        participant_id: ParticipantId,
    ) -> SessionResult<()> {
        let request = self.http_client.delete(self.endpoint(&format!(
            "/sessions/{session_id}/participants/{participant_id}"
        )));
        self.send(request, "remove participant").await?;

        Ok(())
    }
}

#[async_trait]
impl AccessBackend for HttpTrainingBackend {
    async fn current_user(&self) -> SessionResult<UserAccess> {
        let operation = "load current user";
        let request = self.http_client.get(self.endpoint("/me"));
        let response = self.send(request, operation).await?;
        let body: CurrentUserResponse = Self::decode(response, operation).await?;

        Ok(body.into_domain()?)
    }
}
