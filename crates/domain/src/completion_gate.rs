use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{Attendance, ParticipantId, Roster, SessionState, TrainingSession};

/// One unmet finalization rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum FinalizationBlocker {
    /// Session is not running.
    NotInProgress {
        /// Current state.
        state: SessionState,
    },
    /// Participants without an attendance mark.
    MissingAttendance {
        /// Unmarked participants.
        participants: Vec<ParticipantId>,
    },
    /// Attendees without an uploaded exam.
    MissingExams {
        /// Attendees lacking an exam.
        participants: Vec<ParticipantId>,
    },
}

impl FinalizationBlocker {
    /// Returns a stable rule identifier.
    #[must_use]
    pub fn rule(&self) -> &'static str {
        match self {
            Self::NotInProgress { .. } => "not_in_progress",
            Self::MissingAttendance { .. } => "missing_attendance",
            Self::MissingExams { .. } => "missing_exams",
        }
    }
}

impl Display for FinalizationBlocker {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInProgress { state } => {
                write!(formatter, "session is {state}, not IN_PROGRESS")
            }
            Self::MissingAttendance { participants } => write!(
                formatter,
                "{} participant(s) without attendance mark",
                participants.len()
            ),
            Self::MissingExams { participants } => write!(
                formatter,
                "{} attendee(s) without uploaded exam",
                participants.len()
            ),
        }
    }
}

/// Outcome of evaluating the finalization rules.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FinalizationCheck {
    blockers: Vec<FinalizationBlocker>,
}

impl FinalizationCheck {
    /// Returns whether every rule holds.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.blockers.is_empty()
    }

    /// Returns the unmet rules.
    #[must_use]
    pub fn blockers(&self) -> &[FinalizationBlocker] {
        &self.blockers
    }

    /// Consumes the check and returns the unmet rules.
    #[must_use]
    pub fn into_blockers(self) -> Vec<FinalizationBlocker> {
        self.blockers
    }
}

/// Evaluates every finalization rule and reports the ones that fail.
///
/// Diplomas are not part of the gate; they may be issued after finalization.
#[must_use]
pub fn evaluate_finalization(session: &TrainingSession, roster: &Roster) -> FinalizationCheck {
    let mut blockers = Vec::new();

    if session.state() != SessionState::InProgress {
        blockers.push(FinalizationBlocker::NotInProgress {
            state: session.state(),
        });
    }

    let unmarked: Vec<ParticipantId> = roster
        .iter()
        .filter(|record| !record.attendance().is_marked())
        .map(|record| record.participant_id())
        .collect();
    if !unmarked.is_empty() {
        blockers.push(FinalizationBlocker::MissingAttendance {
            participants: unmarked,
        });
    }

    if session.exam().applies() {
        let missing_exams: Vec<ParticipantId> = roster
            .iter()
            .filter(|record| record.attendance() == Attendance::Present && record.exam().is_none())
            .map(|record| record.participant_id())
            .collect();
        if !missing_exams.is_empty() {
            blockers.push(FinalizationBlocker::MissingExams {
                participants: missing_exams,
            });
        }
    }

    FinalizationCheck { blockers }
}

/// Returns whether the session may move to FINALIZED_BY_TRAINER now.
#[must_use]
pub fn can_finalize(session: &TrainingSession, roster: &Roster) -> bool {
    evaluate_finalization(session, roster).is_ready()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{FinalizationBlocker, can_finalize, evaluate_finalization};
    use crate::test_support::{document, minimum_grade_policy, roster_for, session_in};
    use crate::{ExamPolicy, ParticipantId, SessionState};

    fn state_strategy() -> impl Strategy<Value = SessionState> {
        prop::sample::select(SessionState::all().to_vec())
    }

    fn attendance_strategy() -> impl Strategy<Value = Vec<Option<bool>>> {
        prop::collection::vec(prop::option::of(any::<bool>()), 0..8)
    }

    fn fresh_ids(count: usize) -> Vec<ParticipantId> {
        (0..count).map(|_| ParticipantId::new()).collect()
    }

    proptest! {
        #[test]
        fn never_ready_outside_in_progress(
            state in state_strategy(),
            marks in attendance_strategy(),
            exam_applies in any::<bool>(),
        ) {
            prop_assume!(state != SessionState::InProgress);
            let exam = if exam_applies {
                minimum_grade_policy(60.0)
            } else {
                ExamPolicy::NotApplicable
            };
            let session = session_in(state, exam);
            let participants = fresh_ids(marks.len());
            let mut roster = roster_for(&session, &participants);
            for (participant, mark) in participants.iter().zip(&marks) {
                if let Some(present) = mark {
                    prop_assert!(roster.set_attendance(*participant, *present).is_ok());
                }
            }

            prop_assert!(!can_finalize(&session, &roster));
        }

        #[test]
        fn fully_marked_roster_without_exam_is_ready(
            marks in prop::collection::vec(any::<bool>(), 0..8),
            diploma_applies in any::<bool>(),
        ) {
            let session = crate::test_support::session_with(
                SessionState::InProgress,
                ExamPolicy::NotApplicable,
                diploma_applies,
            );
            let participants = fresh_ids(marks.len());
            let mut roster = roster_for(&session, &participants);
            for (participant, present) in participants.iter().zip(&marks) {
                prop_assert!(roster.set_attendance(*participant, *present).is_ok());
            }

            prop_assert!(can_finalize(&session, &roster));
        }

        #[test]
        fn attendee_without_exam_blocks(
            extra_attendees in 0_usize..5,
        ) {
            let session = session_in(SessionState::InProgress, minimum_grade_policy(70.0));
            let lacking = ParticipantId::new();
            let others = fresh_ids(extra_attendees);
            let mut all = others.clone();
            all.push(lacking);
            let mut roster = roster_for(&session, &all);
            prop_assert!(roster.set_attendance_for_many(&all, true).is_ok());
            for participant in &others {
                prop_assert!(roster.attach_exam(*participant, document("exam")).is_ok());
            }

            prop_assert!(!can_finalize(&session, &roster));
        }
    }

    #[test]
    fn scenario_exam_attached_for_all_attendees() {
        let session = session_in(SessionState::InProgress, minimum_grade_policy(70.0));
        let first = ParticipantId::new();
        let second = ParticipantId::new();
        let third = ParticipantId::new();
        let mut roster = roster_for(&session, &[first, second, third]);

        assert!(roster.set_attendance(first, true).is_ok());
        assert!(roster.set_attendance(second, true).is_ok());
        assert!(roster.set_attendance(third, false).is_ok());
        assert!(roster.set_grade(first, 80.0).is_ok());
        assert!(roster.set_grade(second, 60.0).is_ok());
        assert!(roster.attach_exam(first, document("exam-first")).is_ok());

        let check = evaluate_finalization(&session, &roster);
        assert_eq!(
            check.blockers(),
            &[FinalizationBlocker::MissingExams {
                participants: vec![second],
            }]
        );

        assert!(roster.attach_exam(second, document("exam-second")).is_ok());
        assert!(can_finalize(&session, &roster));
    }

    #[test]
    fn scenario_no_exam_two_present_one_absent() {
        let session = crate::test_support::session_with(
            SessionState::InProgress,
            ExamPolicy::NotApplicable,
            true,
        );
        let participants = [ParticipantId::new(), ParticipantId::new(), ParticipantId::new()];
        let mut roster = roster_for(&session, &participants);
        assert!(roster.set_attendance_for_many(&participants[..2], true).is_ok());
        assert!(roster.set_attendance(participants[2], false).is_ok());

        assert!(can_finalize(&session, &roster));
    }

    #[test]
    fn reports_every_failing_rule() {
        let session = session_in(SessionState::Assigned, minimum_grade_policy(50.0));
        let marked = ParticipantId::new();
        let unmarked = ParticipantId::new();
        let mut roster = roster_for(&session, &[marked, unmarked]);
        assert!(roster.set_attendance(marked, true).is_ok());

        let rules: Vec<&str> = evaluate_finalization(&session, &roster)
            .blockers()
            .iter()
            .map(FinalizationBlocker::rule)
            .collect();

        assert_eq!(
            rules,
            vec!["not_in_progress", "missing_attendance", "missing_exams"]
        );
    }
}
