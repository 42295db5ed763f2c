use std::collections::{BTreeMap, VecDeque};

use capacita_domain::{
    FinalizationCheck, ParticipantId, ParticipantMutationError, ParticipantRecord,
    ParticipantStatus, Roster, TrainingSession, evaluate_finalization,
};
use tokio::sync::watch;

use crate::{ParticipantPatch, SessionSnapshot};

/// Local working copy of one session and its roster.
///
/// Roster edits are applied here first and queued per participant until the
/// backend confirms them. After every change the completion gate is
/// re-evaluated and published to subscribers.
#[derive(Debug)]
pub struct SessionWorkspace {
    session: TrainingSession,
    roster: Roster,
    confirmed: BTreeMap<ParticipantId, ParticipantRecord>,
    pending: BTreeMap<ParticipantId, VecDeque<ParticipantPatch>>,
    gate: watch::Sender<FinalizationCheck>,
}

impl SessionWorkspace {
    /// Creates a workspace from a freshly loaded snapshot.
    #[must_use]
    pub fn new(snapshot: SessionSnapshot) -> Self {
        let SessionSnapshot { session, roster } = snapshot;
        let (gate, _) = watch::channel(evaluate_finalization(&session, &roster));
        let confirmed = confirmed_records(&roster);

        Self {
            session,
            roster,
            confirmed,
            pending: BTreeMap::new(),
            gate,
        }
    }

    /// Returns the session.
    #[must_use]
    pub fn session(&self) -> &TrainingSession {
        &self.session
    }

    /// Returns the roster including unsynced local edits.
    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Evaluates the completion gate against the current local state.
    #[must_use]
    pub fn finalization_check(&self) -> FinalizationCheck {
        evaluate_finalization(&self.session, &self.roster)
    }

    /// Subscribes to gate results published after every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FinalizationCheck> {
        self.gate.subscribe()
    }

    /// Returns whether any roster edit is waiting for the backend.
    #[must_use]
    pub fn has_pending_edits(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Returns the participants with edits waiting for the backend.
    #[must_use]
    pub fn pending_participants(&self) -> Vec<ParticipantId> {
        self.pending.keys().copied().collect()
    }

    pub(crate) fn apply_local(
        &mut self,
        participant_id: ParticipantId,
        patch: ParticipantPatch,
    ) -> Result<ParticipantStatus, ParticipantMutationError> {
        patch.ensure_allowed_in(self.session.state())?;

        let status = patch.apply_to(&mut self.roster, participant_id)?;

        self.pending
            .entry(participant_id)
            .or_default()
            .push_back(patch);
        self.publish();

        Ok(status)
    }

    pub(crate) fn apply_local_attendance(
        &mut self,
        participant_ids: &[ParticipantId],
        present: bool,
    ) -> Result<(), ParticipantMutationError> {
        ParticipantPatch::Attendance(present).ensure_allowed_in(self.session.state())?;
        self.roster.set_attendance_for_many(participant_ids, present)?;

        for participant_id in participant_ids {
            self.pending
                .entry(*participant_id)
                .or_default()
                .push_back(ParticipantPatch::Attendance(present));
        }
        self.publish();

        Ok(())
    }

    pub(crate) fn next_pending(&self, participant_id: ParticipantId) -> Option<ParticipantPatch> {
        self.pending
            .get(&participant_id)
            .and_then(|queue| queue.front().cloned())
    }

    /// Records the backend's confirmation of the oldest queued edit.
    ///
    /// Fails without touching anything when the participant is no longer on
    /// the roster.
    pub(crate) fn acknowledge(
        &mut self,
        record: ParticipantRecord,
    ) -> Result<(), ParticipantMutationError> {
        let participant_id = record.participant_id();
        if self.roster.get(participant_id).is_none() {
            return Err(ParticipantMutationError::UnknownParticipant(participant_id));
        }

        let drained = match self.pending.get_mut(&participant_id) {
            Some(queue) => {
                queue.pop_front();
                queue.is_empty()
            }
            None => true,
        };

        if drained {
            self.pending.remove(&participant_id);
            // Nothing local is ahead of the backend any more.
            self.roster.replace_record(record.clone())?;
            self.publish();
        }
        self.confirmed.insert(participant_id, record);

        Ok(())
    }

    /// Drops every queued edit of the participant and restores the last
    /// backend-confirmed record.
    pub(crate) fn discard_pending(
        &mut self,
        participant_id: ParticipantId,
    ) -> Result<(), ParticipantMutationError> {
        self.pending.remove(&participant_id);
        let restored = match self.confirmed.get(&participant_id) {
            Some(record) => self.roster.replace_record(record.clone()),
            None => Err(ParticipantMutationError::UnknownParticipant(participant_id)),
        };
        self.publish();

        restored
    }

    pub(crate) fn ensure_enrolment_allowed(&self) -> Result<(), ParticipantMutationError> {
        let state = self.session.state();
        if state.accepts_enrolment() {
            Ok(())
        } else {
            Err(ParticipantMutationError::NotAllowedInState(state))
        }
    }

    pub(crate) fn enrol(
        &mut self,
        record: ParticipantRecord,
    ) -> Result<(), ParticipantMutationError> {
        self.roster.add_participant(record.participant_id())?;
        self.roster.replace_record(record.clone())?;
        self.confirmed.insert(record.participant_id(), record);
        self.publish();
        Ok(())
    }

    pub(crate) fn unenrol(
        &mut self,
        participant_id: ParticipantId,
    ) -> Result<(), ParticipantMutationError> {
        self.roster.remove_participant(participant_id)?;
        self.confirmed.remove(&participant_id);
        self.pending.remove(&participant_id);
        self.publish();
        Ok(())
    }

    pub(crate) fn replace_session(&mut self, session: TrainingSession) {
        self.session = session;
        self.publish();
    }

    pub(crate) fn replace_snapshot(&mut self, snapshot: SessionSnapshot) {
        let SessionSnapshot { session, roster } = snapshot;
        self.confirmed = confirmed_records(&roster);
        self.pending.clear();
        self.session = session;
        self.roster = roster;
        self.publish();
    }

    fn publish(&self) {
        self.gate
            .send_replace(evaluate_finalization(&self.session, &self.roster));
    }
}

fn confirmed_records(roster: &Roster) -> BTreeMap<ParticipantId, ParticipantRecord> {
    roster
        .iter()
        .map(|record| (record.participant_id(), record.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use capacita_domain::{
        Attendance, FinalizationBlocker, ParticipantId, ParticipantMutationError,
        ParticipantStatus, SessionState,
    };

    use super::SessionWorkspace;
    use crate::ParticipantPatch;
    use crate::test_support::{document, snapshot};

    #[test]
    fn every_local_edit_republishes_the_gate() {
        let participant = ParticipantId::new();
        let mut workspace = SessionWorkspace::new(snapshot(
            SessionState::InProgress,
            false,
            &[participant],
        ));
        let receiver = workspace.subscribe();
        assert!(!receiver.borrow().is_ready());

        let status = workspace.apply_local(participant, ParticipantPatch::Attendance(false));

        assert_eq!(status, Ok(ParticipantStatus::DidNotAttend));
        assert!(receiver.borrow().is_ready());
        assert!(workspace.has_pending_edits());
    }

    #[test]
    fn repeated_attendance_keeps_status() {
        let participant = ParticipantId::new();
        let mut workspace = SessionWorkspace::new(snapshot(
            SessionState::InProgress,
            true,
            &[participant],
        ));

        let first = workspace.apply_local(participant, ParticipantPatch::Attendance(true));
        let second = workspace.apply_local(participant, ParticipantPatch::Attendance(true));

        assert_eq!(first, Ok(ParticipantStatus::AttendedUngraded));
        assert_eq!(first, second);
    }

    #[test]
    fn marks_are_rejected_before_start() {
        let participant = ParticipantId::new();
        let mut workspace = SessionWorkspace::new(snapshot(
            SessionState::Assigned,
            false,
            &[participant],
        ));

        let result = workspace.apply_local(participant, ParticipantPatch::Attendance(true));

        assert_eq!(
            result,
            Err(ParticipantMutationError::NotAllowedInState(SessionState::Assigned))
        );
        assert!(!workspace.has_pending_edits());
    }

    #[test]
    fn diplomas_allowed_after_trainer_finalization() {
        let participant = ParticipantId::new();
        let mut workspace = SessionWorkspace::new(snapshot(
            SessionState::InProgress,
            false,
            &[participant],
        ));
        assert!(
            workspace
                .apply_local(participant, ParticipantPatch::Attendance(true))
                .is_ok()
        );
        let mut session = workspace.session().clone();
        assert!(session.apply_transition(SessionState::FinalizedByTrainer).is_ok());
        workspace.replace_session(session);

        let diploma = workspace.apply_local(
            participant,
            ParticipantPatch::AttachDiploma(document("diploma-1")),
        );
        let grade = workspace.apply_local(participant, ParticipantPatch::Grade(90.0));

        assert!(diploma.is_ok());
        assert!(matches!(
            grade,
            Err(ParticipantMutationError::NotAllowedInState(
                SessionState::FinalizedByTrainer
            ))
        ));
    }

    #[test]
    fn discard_restores_confirmed_record() {
        let participant = ParticipantId::new();
        let mut workspace = SessionWorkspace::new(snapshot(
            SessionState::InProgress,
            true,
            &[participant],
        ));
        assert!(
            workspace
                .apply_local(participant, ParticipantPatch::Attendance(true))
                .is_ok()
        );

        assert_eq!(workspace.discard_pending(participant), Ok(()));

        assert_eq!(
            workspace.roster().get(participant).map(|record| record.attendance()),
            Some(Attendance::Unset)
        );
        assert!(!workspace.has_pending_edits());
        assert!(matches!(
            workspace.finalization_check().blockers(),
            [FinalizationBlocker::MissingAttendance { .. }]
        ));
    }

    #[test]
    fn acknowledge_keeps_local_state_while_edits_remain() {
        let participant = ParticipantId::new();
        let mut workspace = SessionWorkspace::new(snapshot(
            SessionState::InProgress,
            true,
            &[participant],
        ));
        assert!(
            workspace
                .apply_local(participant, ParticipantPatch::Attendance(true))
                .is_ok()
        );
        assert!(
            workspace
                .apply_local(participant, ParticipantPatch::Grade(75.0))
                .is_ok()
        );
        let Some(confirmed_attendance) = workspace
            .roster()
            .get(participant)
            .cloned()
        else {
            panic!("participant should exist");
        };

        assert_eq!(workspace.acknowledge(confirmed_attendance), Ok(()));

        assert_eq!(
            workspace.next_pending(participant),
            Some(ParticipantPatch::Grade(75.0))
        );
        assert_eq!(
            workspace.roster().status_of(participant),
            Ok(ParticipantStatus::Passed)
        );
    }

    #[test]
    fn confirmation_for_removed_participant_is_refused() {
        let kept = ParticipantId::new();
        let removed = ParticipantId::new();
        let mut workspace = SessionWorkspace::new(snapshot(
            SessionState::InProgress,
            false,
            &[kept, removed],
        ));
        assert!(
            workspace
                .apply_local(removed, ParticipantPatch::Attendance(true))
                .is_ok()
        );
        let Some(stale) = workspace.roster().get(removed).cloned() else {
            panic!("participant should exist");
        };
        assert_eq!(workspace.unenrol(removed), Ok(()));

        assert_eq!(
            workspace.acknowledge(stale),
            Err(ParticipantMutationError::UnknownParticipant(removed))
        );
        assert_eq!(
            workspace.discard_pending(removed),
            Err(ParticipantMutationError::UnknownParticipant(removed))
        );
        assert_eq!(workspace.roster().len(), 1);
        assert!(!workspace.has_pending_edits());
    }
}
