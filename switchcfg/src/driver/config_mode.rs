//! Configuration-mode driver.
//!
//! Applies an ordered list of statements inside configuration mode, then
//! leaves it and persists the result:
//!
//! ```text
//! Idle -> EnteringConfig -> ApplyingCommand[0..n] -> ExitingConfig -> Saving -> Done
//! ```
//!
//! Every state can only fail forward to an error. Each statement must be
//! confirmed by the configuration prompt before the next one is sent, so
//! statements are never skipped or reordered.
//!
//! Statements applied before a failure are **not** rolled back; the device
//! has no generic undo at this layer. A failed run leaves the device
//! partially configured and is reported as such.

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::channel::{Expect, PromptSet, Session};
use crate::error::ConfigError;
use crate::job::{ConfigModeCommands, Timeouts};
use crate::transport::Transport;

/// Result of one configuration statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementResult {
    /// The statement as sent.
    pub command: String,

    /// Device output between the statement and the next prompt, for
    /// display; invalid UTF-8 is replaced.
    pub output: String,

    /// Time until the configuration prompt reappeared.
    pub elapsed: Duration,

    /// Device error marker found in the output, if any.
    pub failure_message: Option<String>,
}

impl StatementResult {
    /// Check if the device accepted the statement without complaint.
    pub fn is_success(&self) -> bool {
        self.failure_message.is_none()
    }
}

/// Acknowledgement of a completed configuration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// Per-statement results, in the order sent.
    pub statements: Vec<StatementResult>,

    /// Total time from entering configuration mode to the save completing.
    pub elapsed: Duration,
}

impl Ack {
    /// Statements whose output contained a device error marker.
    pub fn rejected(&self) -> impl Iterator<Item = &StatementResult> {
        self.statements.iter().filter(|s| !s.is_success())
    }
}

/// What the configuration driver needs besides the session and statements.
#[derive(Debug, Clone, Copy)]
pub struct ConfigPlan<'a> {
    pub mode: &'a ConfigModeCommands,
    pub timeouts: &'a Timeouts,
    pub prompts: &'a PromptSet,
    pub failed_when_contains: &'a [String],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigState {
    Idle,
    EnteringConfig,
    ApplyingCommand(usize),
    ExitingConfig,
    Saving,
    Done,
}

/// Apply `commands` in configuration mode, then exit and save.
pub async fn apply_config<T: Transport>(
    session: &mut Session<T>,
    commands: &[String],
    plan: &ConfigPlan<'_>,
) -> Result<Ack, ConfigError> {
    let start = Instant::now();
    let mut statements = Vec::with_capacity(commands.len());

    let result = run(session, commands, plan, &mut statements).await;

    match result {
        Ok(()) => Ok(Ack {
            statements,
            elapsed: start.elapsed(),
        }),
        Err(e) => {
            if !matches!(e, ConfigError::EnterFailed) {
                warn!(
                    "{}: configuration aborted after {} of {} statement(s) were confirmed; \
                     changes already applied are not rolled back",
                    session.host(),
                    statements.len(),
                    commands.len()
                );
            }
            Err(e)
        }
    }
}

async fn run<T: Transport>(
    session: &mut Session<T>,
    commands: &[String],
    plan: &ConfigPlan<'_>,
    statements: &mut Vec<StatementResult>,
) -> Result<(), ConfigError> {
    let prompts = plan.prompts;
    let timeouts = plan.timeouts;
    let mut state = ConfigState::Idle;

    loop {
        debug!("{}: config state {:?}", session.host(), state);

        state = match state {
            ConfigState::Idle => ConfigState::EnteringConfig,

            ConfigState::EnteringConfig => {
                info!("{}: entering configuration mode", session.host());
                session.send_line(&plan.mode.enter).await?;
                match session.expect_any(&[&prompts.config], timeouts.config).await? {
                    Expect::Matched(_) => ConfigState::ApplyingCommand(0),
                    Expect::Timeout { .. } | Expect::Eof { .. } => {
                        return Err(ConfigError::EnterFailed);
                    }
                }
            }

            ConfigState::ApplyingCommand(index) => match commands.get(index) {
                None => ConfigState::ExitingConfig,
                Some(command) => {
                    info!("{}: executing '{}'", session.host(), command);
                    let sent = Instant::now();
                    session.send_line(command).await?;
                    match session.expect_any(&[&prompts.config], timeouts.config).await? {
                        Expect::Matched(m) => {
                            let output = String::from_utf8_lossy(&m.before).into_owned();
                            let failure_message = plan
                                .failed_when_contains
                                .iter()
                                .find(|marker| output.contains(marker.as_str()))
                                .cloned();
                            if let Some(ref marker) = failure_message {
                                warn!(
                                    "{}: device reported '{}' for '{}'",
                                    session.host(),
                                    marker,
                                    command
                                );
                            }
                            statements.push(StatementResult {
                                command: command.clone(),
                                output,
                                elapsed: sent.elapsed(),
                                failure_message,
                            });
                            ConfigState::ApplyingCommand(index + 1)
                        }
                        Expect::Timeout { .. } | Expect::Eof { .. } => {
                            return Err(ConfigError::CommandFailed {
                                index,
                                command: command.clone(),
                            });
                        }
                    }
                }
            },

            ConfigState::ExitingConfig => {
                info!("{}: exiting configuration mode", session.host());
                session.send_line(&plan.mode.exit).await?;
                match session.expect_any(&[&prompts.exec], timeouts.exit).await? {
                    Expect::Matched(_) => ConfigState::Saving,
                    Expect::Timeout { .. } | Expect::Eof { .. } => {
                        return Err(ConfigError::ExitFailed);
                    }
                }
            }

            ConfigState::Saving => {
                info!("{}: saving configuration", session.host());
                session.send_line(&plan.mode.save).await?;
                match session.expect_any(&[&prompts.exec], timeouts.save).await? {
                    Expect::Matched(_) => ConfigState::Done,
                    Expect::Timeout { .. } | Expect::Eof { .. } => {
                        return Err(ConfigError::SaveFailed);
                    }
                }
            }

            ConfigState::Done => return Ok(()),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockTransport, lock};

    struct Fixture {
        mode: ConfigModeCommands,
        timeouts: Timeouts,
        prompts: PromptSet,
        failed_when_contains: Vec<String>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                mode: ConfigModeCommands::default(),
                timeouts: Timeouts::uniform(Duration::from_millis(50)),
                prompts: PromptSet::standard().unwrap(),
                failed_when_contains: vec!["Invalid input".to_string()],
            }
        }

        fn plan(&self) -> ConfigPlan<'_> {
            ConfigPlan {
                mode: &self.mode,
                timeouts: &self.timeouts,
                prompts: &self.prompts,
                failed_when_contains: &self.failed_when_contains,
            }
        }
    }

    fn commands(list: &[&str]) -> Vec<String> {
        list.iter().map(|c| c.to_string()).collect()
    }

    /// A device that accepts every statement in `accepted`.
    fn accepting_device(accepted: &[&str]) -> MockTransport {
        let mut transport =
            MockTransport::new().on_line("configure terminal", "configure terminal\r\nsw1(config)# ");
        for command in accepted {
            transport = transport.on_line(command, &format!("{}\r\nsw1(config)# ", command));
        }
        transport
            .on_line("exit", "exit\r\nsw1# ")
            .on_line("write memory", "write memory\r\nsw1# ")
    }

    #[tokio::test]
    async fn test_applies_in_order_then_exits_and_saves() {
        let fixture = Fixture::new();
        let list = commands(&["conf t", "no tftp client", "logging 10.0.0.9"]);
        let transport = accepting_device(&["conf t", "no tftp client", "logging 10.0.0.9"]);
        let log = transport.log();
        let mut session = Session::new("sw1", transport, Duration::from_millis(50));

        let ack = apply_config(&mut session, &list, &fixture.plan())
            .await
            .unwrap();
        session.close().await.unwrap();

        assert_eq!(ack.statements.len(), 3);
        assert_eq!(ack.rejected().count(), 0);
        assert_eq!(
            lock(&log).writes,
            vec![
                "configure terminal\n",
                "conf t\n",
                "no tftp client\n",
                "logging 10.0.0.9\n",
                "exit\n",
                "write memory\n",
            ]
        );
    }

    #[tokio::test]
    async fn test_stops_at_unconfirmed_statement() {
        let fixture = Fixture::new();
        let list = commands(&["conf t", "aruba-central disable", "logging 10.0.0.9"]);
        // Only the first statement gets a configuration prompt back.
        let transport = MockTransport::new()
            .on_line("configure terminal", "sw1(config)# ")
            .on_line("conf t", "sw1(config)# ");
        let log = transport.log();
        let mut session = Session::new("sw1", transport, Duration::from_millis(50));

        let err = apply_config(&mut session, &list, &fixture.plan())
            .await
            .unwrap_err();
        session.close().await.unwrap();

        match err {
            ConfigError::CommandFailed { index, command } => {
                assert_eq!(index, 1);
                assert_eq!(command, "aruba-central disable");
            }
            other => panic!("unexpected {:?}", other),
        }
        let log = lock(&log);
        assert!(!log.writes.iter().any(|w| w == "logging 10.0.0.9\n"));
        assert_eq!(log.writes.last().map(String::as_str), Some("aruba-central disable\n"));
    }

    #[tokio::test]
    async fn test_enter_failed_sends_nothing_else() {
        let fixture = Fixture::new();
        let list = commands(&["conf t", "logging 10.0.0.9"]);
        let transport = MockTransport::new().on_line("configure terminal", "sw1# ");
        let log = transport.log();
        let mut session = Session::new("sw1", transport, Duration::from_millis(50));

        let err = apply_config(&mut session, &list, &fixture.plan())
            .await
            .unwrap_err();
        session.close().await.unwrap();

        assert!(matches!(err, ConfigError::EnterFailed));
        let log = lock(&log);
        assert_eq!(log.writes, vec!["configure terminal\n"]);
        assert_eq!(log.closes, 1);
    }

    #[tokio::test]
    async fn test_rejected_statement_is_recorded_not_fatal() {
        let fixture = Fixture::new();
        let list = commands(&["ip dns server-address priority 1 bogus"]);
        let transport = MockTransport::new()
            .on_line("configure terminal", "sw1(config)# ")
            .on_line(
                "ip dns server-address priority 1 bogus",
                "Invalid input: bogus\r\nsw1(config)# ",
            )
            .on_line("exit", "sw1# ")
            .on_line("write memory", "sw1# ");
        let mut session = Session::new("sw1", transport, Duration::from_millis(50));

        let ack = apply_config(&mut session, &list, &fixture.plan())
            .await
            .unwrap();
        session.close().await.unwrap();

        let rejected: Vec<_> = ack.rejected().collect();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].failure_message.as_deref(), Some("Invalid input"));
    }

    #[tokio::test]
    async fn test_exit_and_save_failures() {
        let fixture = Fixture::new();
        let list = commands(&["logging 10.0.0.9"]);

        let silent_exit = MockTransport::new()
            .on_line("configure terminal", "sw1(config)# ")
            .on_line("logging 10.0.0.9", "sw1(config)# ");
        let mut session = Session::new("sw1", silent_exit, Duration::from_millis(50));
        let err = apply_config(&mut session, &list, &fixture.plan())
            .await
            .unwrap_err();
        session.close().await.unwrap();
        assert!(matches!(err, ConfigError::ExitFailed));

        let slow_save = MockTransport::new()
            .on_line("configure terminal", "sw1(config)# ")
            .on_line("logging 10.0.0.9", "sw1(config)# ")
            .on_line("exit", "sw1# ");
        let mut session = Session::new("sw1", slow_save, Duration::from_millis(50));
        let err = apply_config(&mut session, &list, &fixture.plan())
            .await
            .unwrap_err();
        session.close().await.unwrap();
        assert!(matches!(err, ConfigError::SaveFailed));
    }
}
