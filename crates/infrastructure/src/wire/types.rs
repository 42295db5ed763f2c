use capacita_domain::{Modality, OriginKind, SessionState, TrainingType};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session attributes as exchanged with the backend.
///
/// Optional attributes are always serialized, as `null` when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub name: String,
    pub training_type: TrainingType,
    pub modality: Modality,
    pub scheduled_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub trainer: Option<TrainerPayload>,
    pub exam_applies: bool,
    pub minimum_grade: Option<f64>,
    pub diploma_applies: bool,
    pub objective: Option<String>,
    pub observations: Option<String>,
    pub origin_kind: OriginKind,
    pub origin_name: String,
    pub state: SessionState,
    pub last_review_note: Option<String>,
}

/// Trainer reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainerPayload {
    pub id: Uuid,
    pub name: String,
}

/// One roster row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantResponse {
    pub participant_id: Uuid,
    pub attendance: Option<bool>,
    pub grade: Option<f64>,
    pub exam_ref: Option<String>,
    pub diploma_ref: Option<String>,
    pub observations: Option<String>,
}

/// Body of `GET /sessions/{id}` and of the assignment response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshotResponse {
    pub session: SessionResponse,
    pub participants: Vec<ParticipantResponse>,
}

/// Body of `PATCH /sessions/{id}/state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub target_state: SessionState,
    pub reason: Option<String>,
}

/// Body of `PATCH /sessions/{id}/participants/{pid}`.
///
/// One field per request; a `null` document reference removes the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum ParticipantPatchRequest {
    Attendance(bool),
    Grade(f64),
    ExamRef(Option<String>),
    DiplomaRef(Option<String>),
    Observations(Option<String>),
}

/// Body of `PUT /sessions/{id}/assignment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRequest {
    pub trainer: TrainerPayload,
    pub scheduled_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub participants: Vec<Uuid>,
}

/// Body of `POST /sessions/{id}/participants`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddParticipantRequest {
    pub participant_id: Uuid,
}

/// Structured rejection body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: String,
    pub detail: String,
}

/// Body of `GET /me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUserResponse {
    pub subject: String,
    pub display_name: String,
    pub email: Option<String>,
    pub roles: Vec<RoleResponse>,
}

/// One role with its granted permission keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleResponse {
    pub name: String,
    pub permissions: Vec<String>,
}
