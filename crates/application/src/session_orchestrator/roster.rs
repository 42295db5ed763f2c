use capacita_domain::{DocumentRef, ParticipantId, ParticipantMutationError, ParticipantStatus};

use crate::{ParticipantPatch, RosterCommand};

use super::*;

impl SessionOrchestrator {
    /// Marks one participant present or absent.
    pub async fn set_attendance(
        &self,
        workspace: &mut SessionWorkspace,
        user: Option<&UserAccess>,
        participant_id: ParticipantId,
        present: bool,
    ) -> SessionResult<ParticipantStatus> {
        self.edit(workspace, user, participant_id, ParticipantPatch::Attendance(present))
            .await
    }

    /// Marks several participants at once.
    ///
    /// Nothing changes locally if the local roster rejects any of them. Each
    /// participant is then synced on its own: rejected entries fall back to
    /// their confirmed record, entries that failed in transit stay pending.
    /// Every unsaved participant is named in the returned error.
    pub async fn set_attendance_for_many(
        &self,
        workspace: &mut SessionWorkspace,
        user: Option<&UserAccess>,
        participant_ids: &[ParticipantId],
        present: bool,
    ) -> SessionResult<()> {
        AuthorizationService::require_roster_command(user, RosterCommand::Mark)?;
        workspace.apply_local_attendance(participant_ids, present)?;

        let mut failures = Vec::new();
        for participant_id in participant_ids {
            if let Err(error) = self.sync_participant(workspace, *participant_id).await {
                failures.push((*participant_id, error));
            }
        }

        if failures.is_empty() {
            return Ok(());
        }

        warn!(
            session_id = %workspace.session().id(),
            requested = participant_ids.len(),
            failed = failures.len(),
            "bulk attendance partially saved"
        );
        Err(SessionError::BulkEditIncomplete { failures })
    }

    /// Records a grade.
    pub async fn set_grade(
        &self,
        workspace: &mut SessionWorkspace,
        user: Option<&UserAccess>,
        participant_id: ParticipantId,
        grade: f64,
    ) -> SessionResult<ParticipantStatus> {
        self.edit(workspace, user, participant_id, ParticipantPatch::Grade(grade))
            .await
    }

    /// Attaches an uploaded exam.
    pub async fn attach_exam(
        &self,
        workspace: &mut SessionWorkspace,
        user: Option<&UserAccess>,
        participant_id: ParticipantId,
        document: DocumentRef,
    ) -> SessionResult<ParticipantStatus> {
        self.edit(workspace, user, participant_id, ParticipantPatch::AttachExam(document))
            .await
    }

    /// Removes the exam.
    pub async fn remove_exam(
        &self,
        workspace: &mut SessionWorkspace,
        user: Option<&UserAccess>,
        participant_id: ParticipantId,
    ) -> SessionResult<ParticipantStatus> {
        self.edit(workspace, user, participant_id, ParticipantPatch::RemoveExam)
            .await
    }

    /// Attaches an issued diploma.
    pub async fn attach_diploma(
        &self,
        workspace: &mut SessionWorkspace,
        user: Option<&UserAccess>,
        participant_id: ParticipantId,
        document: DocumentRef,
    ) -> SessionResult<ParticipantStatus> {
        self.edit(workspace, user, participant_id, ParticipantPatch::AttachDiploma(document))
            .await
    }

    /// Removes the diploma.
    pub async fn remove_diploma(
        &self,
        workspace: &mut SessionWorkspace,
        user: Option<&UserAccess>,
        participant_id: ParticipantId,
    ) -> SessionResult<ParticipantStatus> {
        self.edit(workspace, user, participant_id, ParticipantPatch::RemoveDiploma)
            .await
    }

    /// Replaces a participant's observations.
    pub async fn set_observations(
        &self,
        workspace: &mut SessionWorkspace,
        user: Option<&UserAccess>,
        participant_id: ParticipantId,
        observations: Option<String>,
    ) -> SessionResult<ParticipantStatus> {
        self.edit(
            workspace,
            user,
            participant_id,
            ParticipantPatch::Observations(observations),
        )
        .await
    }

    /// Enrols a participant before the session starts.
    pub async fn add_participant(
        &self,
        workspace: &mut SessionWorkspace,
        user: Option<&UserAccess>,
        participant_id: ParticipantId,
    ) -> SessionResult<()> {
        AuthorizationService::require_roster_command(user, RosterCommand::Enrolment)?;
        workspace.ensure_enrolment_allowed()?;
        if workspace.roster().get(participant_id).is_some() {
            return Err(ParticipantMutationError::DuplicateParticipant(participant_id).into());
        }

        let session_id = workspace.session().id();
        let record = self
            .backend
            .add_participant(session_id, participant_id)
            .await?;
        workspace.enrol(record)?;
        debug!(session_id = %session_id, participant_id = %participant_id, "participant enrolled");

        Ok(())
    }

    /// Removes a participant before the session starts.
    pub async fn remove_participant(
        &self,
        workspace: &mut SessionWorkspace,
        user: Option<&UserAccess>,
        participant_id: ParticipantId,
    ) -> SessionResult<()> {
        AuthorizationService::require_roster_command(user, RosterCommand::Enrolment)?;
        workspace.ensure_enrolment_allowed()?;
        if workspace.roster().get(participant_id).is_none() {
            return Err(ParticipantMutationError::UnknownParticipant(participant_id).into());
        }

        let session_id = workspace.session().id();
        self.backend
            .remove_participant(session_id, participant_id)
            .await?;
        workspace.unenrol(participant_id)?;
        debug!(session_id = %session_id, participant_id = %participant_id, "participant removed");

        Ok(())
    }

    /// Pushes every unsynced roster edit to the backend, stopping at the
    /// first failure.
    pub async fn sync_pending(&self, workspace: &mut SessionWorkspace) -> SessionResult<()> {
        for participant_id in workspace.pending_participants() {
            self.sync_participant(workspace, participant_id).await?;
        }

        Ok(())
    }

    async fn edit(
        &self,
        workspace: &mut SessionWorkspace,
        user: Option<&UserAccess>,
        participant_id: ParticipantId,
        patch: ParticipantPatch,
    ) -> SessionResult<ParticipantStatus> {
        AuthorizationService::require_roster_command(user, patch.roster_command())?;
        workspace.apply_local(participant_id, patch)?;
        self.sync_participant(workspace, participant_id).await?;

        Ok(workspace.roster().status_of(participant_id)?)
    }

    async fn sync_participant(
        &self,
        workspace: &mut SessionWorkspace,
        participant_id: ParticipantId,
    ) -> SessionResult<()> {
        let session_id = workspace.session().id();

        while let Some(patch) = workspace.next_pending(participant_id) {
            let change = patch.as_str();
            match self
                .backend
                .patch_participant(session_id, participant_id, patch)
                .await
            {
                Ok(record) => workspace.acknowledge(record)?,
                Err(error @ (SessionError::Network(_) | SessionError::SessionExpired(_))) => {
                    warn!(
                        session_id = %session_id,
                        participant_id = %participant_id,
                        change,
                        error = %error,
                        "roster edit kept locally for retry"
                    );
                    return Err(error);
                }
                Err(error) => {
                    warn!(
                        session_id = %session_id,
                        participant_id = %participant_id,
                        change,
                        error = %error,
                        "roster edit rejected by backend"
                    );
                    if let Err(restore) = workspace.discard_pending(participant_id) {
                        warn!(
                            session_id = %session_id,
                            participant_id = %participant_id,
                            error = %restore,
                            "confirmed record could not be restored"
                        );
                    }
                    return Err(error);
                }
            }
        }

        Ok(())
    }
}
