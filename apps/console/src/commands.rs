use std::str::FromStr;

use capacita_application::{
    AuthorizationService, ErrorResolution, SessionError, SessionOrchestrator, SessionResult,
    SessionWorkspace,
};
use capacita_core::{AppError, AppResult};
use capacita_domain::{ParticipantId, SessionId, SessionState, UserAccess};
use uuid::Uuid;

pub const USAGE: &str = "usage: capacita-console <command>

commands:
  screens                                  list screens the signed-in user may open
  show <session-id>                        print a session and its roster
  check <session-id>                       evaluate the finalization rules
  transition <session-id> <STATE> [reason] request a lifecycle transition
  attendance <session-id> <participant-id> present|absent";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Screens,
    Show(SessionId),
    Check(SessionId),
    Transition {
        session_id: SessionId,
        target: SessionState,
        reason: Option<String>,
    },
    Attendance {
        session_id: SessionId,
        participant_id: ParticipantId,
        present: bool,
    },
}

impl Command {
    pub fn parse(args: &[String]) -> AppResult<Self> {
        let words: Vec<&str> = args.iter().map(String::as_str).collect();

        match words.as_slice() {
            ["screens"] => Ok(Self::Screens),
            ["show", session_id] => Ok(Self::Show(parse_session_id(session_id)?)),
            ["check", session_id] => Ok(Self::Check(parse_session_id(session_id)?)),
            ["transition", session_id, target, reason @ ..] => {
                let target = SessionState::from_str(target)?;
                if !reason.is_empty() && target != SessionState::InProgress {
                    return Err(AppError::Validation(format!(
                        "a reason is only recorded when returning a session to {}",
                        SessionState::InProgress
                    )));
                }

                Ok(Self::Transition {
                    session_id: parse_session_id(session_id)?,
                    target,
                    reason: (!reason.is_empty()).then(|| reason.join(" ")),
                })
            }
            ["attendance", session_id, participant_id, mark] => Ok(Self::Attendance {
                session_id: parse_session_id(session_id)?,
                participant_id: ParticipantId::from_uuid(parse_uuid(participant_id)?),
                present: match *mark {
                    "present" => true,
                    "absent" => false,
                    other => {
                        return Err(AppError::Validation(format!(
                            "attendance must be 'present' or 'absent', got '{other}'"
                        )));
                    }
                },
            }),
            _ => Err(AppError::Validation(USAGE.to_owned())),
        }
    }
}

pub struct Console {
    pub authorization: AuthorizationService,
    pub orchestrator: SessionOrchestrator,
}

impl Console {
    pub async fn run(&self, command: Command) -> SessionResult<()> {
        match command {
            Command::Screens => {
                for screen in self.authorization.resolve_accessible_screens().await? {
                    println!("{}", screen.as_str());
                }
            }
            Command::Show(session_id) => {
                let workspace = self.open(session_id).await?.1;
                print_workspace(&workspace);
            }
            Command::Check(session_id) => {
                let check = self.open(session_id).await?.1.finalization_check();
                if check.is_ready() {
                    println!("ready to finalize");
                }
                for blocker in check.blockers() {
                    println!("blocked: {blocker}");
                }
            }
            Command::Transition {
                session_id,
                target,
                reason,
            } => {
                let (user, mut workspace) = self.open(session_id).await?;
                let state = match reason {
                    Some(reason) => {
                        self.orchestrator
                            .return_to_trainer(&mut workspace, Some(&user), reason)
                            .await?
                    }
                    None => {
                        self.orchestrator
                            .request_transition(&mut workspace, target, Some(&user))
                            .await?
                    }
                };
                println!("session {session_id} is now {state}");
            }
            Command::Attendance {
                session_id,
                participant_id,
                present,
            } => {
                let (user, mut workspace) = self.open(session_id).await?;
                let status = self
                    .orchestrator
                    .set_attendance(&mut workspace, Some(&user), participant_id, present)
                    .await?;
                println!("participant {participant_id} is now {status:?}");
            }
        }

        Ok(())
    }

    async fn open(&self, session_id: SessionId) -> SessionResult<(UserAccess, SessionWorkspace)> {
        let user = self.authorization.current_user().await?;
        let workspace = self.orchestrator.open_session(Some(&user), session_id).await?;
        Ok((user, workspace))
    }
}

fn print_workspace(workspace: &SessionWorkspace) {
    let session = workspace.session();
    println!("{} [{}]", session.name(), session.state());
    if let Some(trainer) = session.trainer() {
        println!("trainer: {}", trainer.name);
    }
    if let Some(schedule) = session.schedule() {
        println!(
            "schedule: {} {}-{}",
            schedule.date(),
            schedule.start_time(),
            schedule.end_time()
        );
    }
    if let Some(note) = session.last_review_note() {
        println!("review note: {note}");
    }

    for record in workspace.roster().iter() {
        println!(
            "  {} {:?}",
            record.participant_id(),
            record.status(session.exam())
        );
    }
}

/// Renders a failed command the way the console presents it.
pub fn describe_failure(error: &SessionError) -> String {
    match error.resolution() {
        ErrorResolution::ShowUnmetRules(rules) => {
            format!("cannot continue:\n  - {}", rules.join("\n  - "))
        }
        ErrorResolution::RedirectAccessDenied => format!("access denied: {error}"),
        ErrorResolution::ForceLogout => {
            "credential expired; sign in again and update CAPACITA_API_TOKEN".to_owned()
        }
        ErrorResolution::OfferRetry => format!("{error}; run the command again to retry"),
        ErrorResolution::ShowMessage(message) => message,
    }
}

fn parse_session_id(value: &str) -> AppResult<SessionId> {
    parse_uuid(value).map(SessionId::from_uuid)
}

fn parse_uuid(value: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|error| AppError::Validation(format!("invalid id '{value}': {error}")))
}

#[cfg(test)]
mod tests {
    use capacita_application::SessionError;
    use capacita_core::AppError;
    use capacita_domain::{FinalizationBlocker, ParticipantId, SessionState};

    use super::{Command, describe_failure};

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|word| (*word).to_owned()).collect()
    }

    #[test]
    fn transition_reason_joins_remaining_words() {
        let command = Command::parse(&args(&[
            "transition",
            "6f1c9a52-4d8e-4b7a-9a39-2f1f3c7d8e10",
            "IN_PROGRESS",
            "missing",
            "signatures",
        ]));

        let Ok(Command::Transition { target, reason, .. }) = command else {
            panic!("transition should parse");
        };
        assert_eq!(target, SessionState::InProgress);
        assert_eq!(reason.as_deref(), Some("missing signatures"));
    }

    #[test]
    fn reason_is_refused_for_other_targets() {
        let command = Command::parse(&args(&[
            "transition",
            "6f1c9a52-4d8e-4b7a-9a39-2f1f3c7d8e10",
            "CANCELLED",
            "budget",
            "cut",
        ]));

        let Err(AppError::Validation(message)) = command else {
            panic!("reason should be refused");
        };
        assert!(message.contains("IN_PROGRESS"));
    }

    #[test]
    fn unknown_state_is_rejected() {
        let command = Command::parse(&args(&[
            "transition",
            "6f1c9a52-4d8e-4b7a-9a39-2f1f3c7d8e10",
            "DONE",
        ]));

        assert!(matches!(command, Err(AppError::Validation(_))));
    }

    #[test]
    fn attendance_requires_present_or_absent() {
        let command = Command::parse(&args(&[
            "attendance",
            "6f1c9a52-4d8e-4b7a-9a39-2f1f3c7d8e10",
            "0b8f8e55-0c1d-4b59-8d0a-5a3c2b1e9f77",
            "late",
        ]));

        assert!(matches!(command, Err(AppError::Validation(_))));
        assert!(Command::parse(&args(&[])).is_err());
    }

    #[test]
    fn blocked_finalization_lists_rules() {
        let message = describe_failure(&SessionError::FinalizationBlocked {
            blockers: vec![FinalizationBlocker::MissingExams {
                participants: vec![ParticipantId::new()],
            }],
        });

        assert!(message.starts_with("cannot continue"));
        assert!(message.contains("exam"));
    }
}
