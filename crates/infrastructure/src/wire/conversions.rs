use capacita_application::{ParticipantPatch, SessionSnapshot};
use capacita_core::{AppError, AppResult, NonEmptyString, UserIdentity};
use capacita_domain::{
    Attendance, DocumentRef, ExamPolicy, GradeScale, ParticipantId, ParticipantRecord,
    PermissionKey, Role, Roster, RosterRules, Schedule, SessionAssignment, SessionId, TrainerRef,
    TrainingOrigin, TrainingSession, TrainingSessionInput, UserAccess,
};

use super::types::{
    AssignmentRequest, CurrentUserResponse, ParticipantPatchRequest, ParticipantResponse,
    RoleResponse, SessionResponse, SessionSnapshotResponse, TrainerPayload,
};

impl SessionResponse {
    /// Validates the payload against the session invariants.
    pub fn into_domain(self, grade_scale: GradeScale) -> AppResult<TrainingSession> {
        let schedule = match (self.scheduled_date, self.start_time, self.end_time) {
            (Some(date), Some(start_time), Some(end_time)) => {
                Some(Schedule::new(date, start_time, end_time)?)
            }
            (None, None, None) => None,
            _ => {
                return Err(AppError::Validation(format!(
                    "session '{}' has an incomplete schedule",
                    self.id
                )));
            }
        };

        let exam = ExamPolicy::from_parts(self.exam_applies, self.minimum_grade, grade_scale)?;

        TrainingSession::new(TrainingSessionInput {
            id: SessionId::from_uuid(self.id),
            name: self.name,
            training_type: self.training_type,
            modality: self.modality,
            schedule,
            trainer: self.trainer.map(TrainerRef::from),
            exam,
            grade_scale,
            diploma_applies: self.diploma_applies,
            objective: self.objective,
            observations: self.observations,
            origin: TrainingOrigin {
                kind: self.origin_kind,
                name: NonEmptyString::new(self.origin_name)?,
            },
            state: self.state,
            last_review_note: self.last_review_note,
        })
    }
}

impl From<&TrainingSession> for SessionResponse {
    fn from(session: &TrainingSession) -> Self {
        let schedule = session.schedule();
        Self {
            id: session.id().as_uuid(),
            name: session.name().as_str().to_owned(),
            training_type: session.training_type(),
            modality: session.modality(),
            scheduled_date: schedule.map(Schedule::date),
            start_time: schedule.map(Schedule::start_time),
            end_time: schedule.map(Schedule::end_time),
            trainer: session.trainer().cloned().map(TrainerPayload::from),
            exam_applies: session.exam().applies(),
            minimum_grade: session.exam().minimum_grade().map(|grade| grade.value()),
            diploma_applies: session.diploma_applies(),
            objective: session.objective().map(str::to_owned),
            observations: session.observations().map(str::to_owned),
            origin_kind: session.origin().kind,
            origin_name: session.origin().name.as_str().to_owned(),
            state: session.state(),
            last_review_note: session.last_review_note().map(str::to_owned),
        }
    }
}

impl From<TrainerPayload> for TrainerRef {
    fn from(value: TrainerPayload) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

impl From<TrainerRef> for TrainerPayload {
    fn from(value: TrainerRef) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

impl ParticipantResponse {
    /// Restores a roster record, checking the grade against the session scale.
    ///
    /// Grades and documents are only meaningful for present participants; a
    /// record carrying them for anyone else is rejected.
    pub fn into_domain(self, grade_scale: GradeScale) -> AppResult<ParticipantRecord> {
        let attendance = Attendance::from_flag(self.attendance);
        if attendance != Attendance::Present
            && (self.grade.is_some() || self.exam_ref.is_some() || self.diploma_ref.is_some())
        {
            return Err(AppError::Validation(format!(
                "participant '{}' is not marked present but carries a grade or documents",
                self.participant_id
            )));
        }

        let grade = self
            .grade
            .map(|value| grade_scale.grade(value))
            .transpose()
            .map_err(|error| {
                AppError::Validation(format!(
                    "participant '{}' has an invalid grade: {error}",
                    self.participant_id
                ))
            })?;

        Ok(ParticipantRecord::restore(
            ParticipantId::from_uuid(self.participant_id),
            attendance,
            grade,
            self.exam_ref.map(DocumentRef::new).transpose()?,
            self.diploma_ref.map(DocumentRef::new).transpose()?,
            self.observations,
        ))
    }
}

impl From<&ParticipantRecord> for ParticipantResponse {
    fn from(record: &ParticipantRecord) -> Self {
        Self {
            participant_id: record.participant_id().as_uuid(),
            attendance: record.attendance().as_flag(),
            grade: record.grade().map(|grade| grade.value()),
            exam_ref: record.exam().map(|document| document.as_str().to_owned()),
            diploma_ref: record.diploma().map(|document| document.as_str().to_owned()),
            observations: record.observations().map(str::to_owned),
        }
    }
}

impl SessionSnapshotResponse {
    /// Validates session and roster together.
    pub fn into_domain(self, grade_scale: GradeScale) -> AppResult<SessionSnapshot> {
        let session = self.session.into_domain(grade_scale)?;
        let records = self
            .participants
            .into_iter()
            .map(|participant| participant.into_domain(grade_scale))
            .collect::<AppResult<Vec<_>>>()?;
        let roster = Roster::new(RosterRules::of(&session), records)?;

        Ok(SessionSnapshot { session, roster })
    }
}

impl From<&SessionSnapshot> for SessionSnapshotResponse {
    fn from(snapshot: &SessionSnapshot) -> Self {
        Self {
            session: SessionResponse::from(&snapshot.session),
            participants: snapshot.roster.iter().map(ParticipantResponse::from).collect(),
        }
    }
}

impl From<&ParticipantPatch> for ParticipantPatchRequest {
    fn from(patch: &ParticipantPatch) -> Self {
        match patch {
            ParticipantPatch::Attendance(present) => Self::Attendance(*present),
            ParticipantPatch::Grade(value) => Self::Grade(*value),
            ParticipantPatch::AttachExam(document) => {
                Self::ExamRef(Some(document.as_str().to_owned()))
            }
            ParticipantPatch::RemoveExam => Self::ExamRef(None),
            ParticipantPatch::AttachDiploma(document) => {
                Self::DiplomaRef(Some(document.as_str().to_owned()))
            }
            ParticipantPatch::RemoveDiploma => Self::DiplomaRef(None),
            ParticipantPatch::Observations(text) => Self::Observations(text.clone()),
        }
    }
}

impl TryFrom<ParticipantPatchRequest> for ParticipantPatch {
    type Error = AppError;

    fn try_from(value: ParticipantPatchRequest) -> Result<Self, Self::Error> {
        Ok(match value {
            ParticipantPatchRequest::Attendance(present) => Self::Attendance(present),
            ParticipantPatchRequest::Grade(grade) => Self::Grade(grade),
            ParticipantPatchRequest::ExamRef(Some(document)) => {
                Self::AttachExam(DocumentRef::new(document)?)
            }
            ParticipantPatchRequest::ExamRef(None) => Self::RemoveExam,
            ParticipantPatchRequest::DiplomaRef(Some(document)) => {
                Self::AttachDiploma(DocumentRef::new(document)?)
            }
            ParticipantPatchRequest::DiplomaRef(None) => Self::RemoveDiploma,
            ParticipantPatchRequest::Observations(text) => Self::Observations(text),
        })
    }
}

impl From<&SessionAssignment> for AssignmentRequest {
    fn from(assignment: &SessionAssignment) -> Self {
        Self {
            trainer: TrainerPayload::from(assignment.trainer.clone()),
            scheduled_date: assignment.schedule.date(),
            start_time: assignment.schedule.start_time(),
            end_time: assignment.schedule.end_time(),
            participants: assignment
                .participants
                .iter()
                .map(ParticipantId::as_uuid)
                .collect(),
        }
    }
}

impl CurrentUserResponse {
    /// Builds the user snapshot, rejecting malformed permission keys.
    pub fn into_domain(self) -> AppResult<UserAccess> {
        let roles = self
            .roles
            .into_iter()
            .map(RoleResponse::into_domain)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(UserAccess::new(
            UserIdentity::new(self.subject, self.display_name, self.email),
            roles,
        ))
    }
}

impl RoleResponse {
    fn into_domain(self) -> AppResult<Role> {
        let permissions = self
            .permissions
            .into_iter()
            .map(PermissionKey::new)
            .collect::<AppResult<Vec<_>>>()?;

        Role::new(self.name, permissions)
    }
}

impl From<&UserAccess> for CurrentUserResponse {
    fn from(user: &UserAccess) -> Self {
        Self {
            subject: user.identity().subject().to_owned(),
            display_name: user.identity().display_name().to_owned(),
            email: user.identity().email().map(str::to_owned),
            roles: user
                .roles()
                .iter()
                .map(|role| RoleResponse {
                    name: role.name().as_str().to_owned(),
                    permissions: role
                        .permissions()
                        .iter()
                        .map(|key| key.as_str().to_owned())
                        .collect(),
                })
                .collect(),
        }
    }
}
