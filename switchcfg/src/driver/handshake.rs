//! Handshake: from "just connected" to an authenticated exec prompt.
//!
//! ```text
//!            ┌─────────────── yes/no ───────────────┐
//!            │                                      ▼
//! ┌──────────┴─────────┐  Password:   ┌──────────────────────────┐
//! │ AwaitingCredential ├──────────────► AwaitingPasswordAfterKey │
//! └──────────┬─────────┘              └────────────┬─────────────┘
//!            │ Password:                           │ Password:
//!            ▼                                     ▼
//! ┌────────────────────┐  banner   ┌──────────────────────────────┐
//! │   AwaitingPrompt   ├───────────►  AwaitingPromptAfterBanner   │
//! └──────────┬─────────┘           └──────────────┬───────────────┘
//!            │ # or >                             │ # or >
//!            ▼                                    ▼
//!                          authenticated Session
//! ```
//!
//! Transports that authenticate below the shell start at `AwaitingPrompt`.
//! There are no retries here; the caller decides whether to skip the host.

use log::{debug, info, warn};

use crate::channel::{ExecMode, Expect, PromptKind, PromptSet, Session};
use crate::error::ConnectError;
use crate::job::Timeouts;
use crate::transport::{Connector, Credentials, Transport};

/// Affirmative answer to the SSH client's host key question.
const HOST_KEY_ANSWER: &str = "yes";

/// Keystroke that dismisses a "press any key" banner.
const BANNER_KEY: &str = "\r";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandshakeState {
    AwaitingCredentialPrompt,
    AwaitingPasswordAfterHostKey,
    AwaitingPrompt,
    AwaitingPromptAfterBanner,
}

/// Open a transport to `host` and log in.
///
/// On success the returned session sits at an exec prompt and records
/// which prompt form ([`ExecMode`]) was seen. On failure the transport,
/// if it was opened, has already been closed.
pub async fn connect<C: Connector>(
    connector: &C,
    host: &str,
    credentials: &Credentials,
    prompts: &PromptSet,
    timeouts: &Timeouts,
) -> Result<Session<C::Transport>, ConnectError> {
    info!("Connecting to {}...", host);

    let transport = connector
        .connect(host, credentials)
        .await
        .map_err(ConnectError::TransportUnreachable)?;

    let mut session = Session::new(host, transport, timeouts.connect);

    match login(&mut session, credentials, prompts, timeouts).await {
        Ok(mode) => {
            if mode == ExecMode::Unprivileged {
                warn!("{}: logged in at an unprivileged '>' prompt", host);
            }
            session.set_exec_mode(mode);
            info!("Successfully connected to switch {}.", host);
            Ok(session)
        }
        Err(e) => {
            if let Err(close_err) = session.close().await {
                warn!("{}: close after failed handshake: {}", host, close_err);
            }
            Err(e)
        }
    }
}

async fn login<T: Transport>(
    session: &mut Session<T>,
    credentials: &Credentials,
    prompts: &PromptSet,
    timeouts: &Timeouts,
) -> Result<ExecMode, ConnectError> {
    let mut state = if session.pre_authenticated() {
        HandshakeState::AwaitingPrompt
    } else {
        HandshakeState::AwaitingCredentialPrompt
    };

    loop {
        debug!("{}: handshake state {:?}", session.host(), state);

        state = match state {
            HandshakeState::AwaitingCredentialPrompt => {
                match session
                    .expect_any(&[&prompts.password, &prompts.host_key], timeouts.connect)
                    .await?
                {
                    Expect::Matched(m) if m.kind == PromptKind::PasswordRequest => {
                        session.send_hidden_line(credentials.password()).await?;
                        HandshakeState::AwaitingPrompt
                    }
                    Expect::Matched(_) => {
                        session.send_line(HOST_KEY_ANSWER).await?;
                        HandshakeState::AwaitingPasswordAfterHostKey
                    }
                    Expect::Timeout { .. } | Expect::Eof { .. } => {
                        return Err(ConnectError::NoResponse);
                    }
                }
            }

            HandshakeState::AwaitingPasswordAfterHostKey => {
                match session
                    .expect_any(&[&prompts.password], timeouts.connect)
                    .await?
                {
                    Expect::Matched(_) => {
                        session.send_hidden_line(credentials.password()).await?;
                        HandshakeState::AwaitingPrompt
                    }
                    Expect::Timeout { .. } | Expect::Eof { .. } => {
                        return Err(ConnectError::UnexpectedHandshake);
                    }
                }
            }

            HandshakeState::AwaitingPrompt => {
                match session
                    .expect_any(
                        &[&prompts.banner, &prompts.privileged, &prompts.unprivileged],
                        timeouts.login,
                    )
                    .await?
                {
                    Expect::Matched(m) => match ExecMode::from_kind(m.kind) {
                        Some(mode) => return Ok(mode),
                        None => {
                            session.send(BANNER_KEY).await?;
                            HandshakeState::AwaitingPromptAfterBanner
                        }
                    },
                    Expect::Timeout { .. } | Expect::Eof { .. } => {
                        return Err(ConnectError::NoPromptAfterLogin);
                    }
                }
            }

            HandshakeState::AwaitingPromptAfterBanner => {
                match session
                    .expect(&[&prompts.privileged, &prompts.unprivileged])
                    .await?
                {
                    Expect::Matched(m) => match ExecMode::from_kind(m.kind) {
                        Some(mode) => return Ok(mode),
                        None => return Err(ConnectError::NoPromptAfterBanner),
                    },
                    Expect::Timeout { .. } | Expect::Eof { .. } => {
                        return Err(ConnectError::NoPromptAfterBanner);
                    }
                }
            }
        };
    }
}
