//! Live session to one host and the prompt race primitive.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use log::{debug, trace, warn};
use tokio::time::Instant;

use super::buffer::PatternBuffer;
use super::patterns::{PromptKind, PromptPattern};
use crate::error::ChannelError;
use crate::transport::Transport;

/// Which exec prompt the device showed after login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// Prompt ends in `#`.
    Privileged,
    /// Prompt ends in `>`.
    Unprivileged,
}

impl ExecMode {
    /// Map a matched prompt kind to an exec mode.
    pub fn from_kind(kind: PromptKind) -> Option<Self> {
        match kind {
            PromptKind::Privileged => Some(ExecMode::Privileged),
            PromptKind::Unprivileged => Some(ExecMode::Unprivileged),
            _ => None,
        }
    }
}

/// A candidate that matched the incoming stream.
#[derive(Debug, Clone)]
pub struct PromptMatch {
    /// Position of the candidate in the raced list.
    pub index: usize,

    /// Tag of the matching pattern.
    pub kind: PromptKind,

    /// Output observed strictly before the match, byte for byte.
    pub before: Bytes,

    /// The matched text itself.
    pub matched: String,
}

/// How a prompt race resolved.
#[derive(Debug, Clone)]
pub enum Expect {
    /// One of the candidates matched.
    Matched(PromptMatch),

    /// The timeout elapsed; carries the unmatched output seen meanwhile.
    Timeout { pending: Bytes },

    /// The remote closed the stream; carries any unmatched output.
    Eof { pending: Bytes },
}

/// An opened transport bound to one host.
///
/// Owns the read buffer and a default timeout. Operations are strictly
/// sequential (`&mut self`), and [`close`](Self::close) consumes the
/// session so it can only be released once.
pub struct Session<T: Transport> {
    host: String,
    transport: Option<T>,
    buffer: PatternBuffer,
    timeout: Duration,
    eof: bool,
    exec_mode: Option<ExecMode>,
}

impl<T: Transport> Session<T> {
    /// Wrap an opened transport.
    pub fn new(host: impl Into<String>, transport: T, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            transport: Some(transport),
            buffer: PatternBuffer::new(),
            timeout,
            eof: false,
            exec_mode: None,
        }
    }

    /// The host this session is connected to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Get the default timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The exec prompt form seen at login, once the handshake completed.
    pub fn exec_mode(&self) -> Option<ExecMode> {
        self.exec_mode
    }

    pub(crate) fn set_exec_mode(&mut self, mode: ExecMode) {
        self.exec_mode = Some(mode);
    }

    /// Whether the transport authenticated below the shell.
    pub fn pre_authenticated(&self) -> bool {
        self.transport
            .as_ref()
            .is_some_and(|transport| transport.authenticated())
    }

    /// Send text without a line terminator (single keystrokes).
    pub async fn send(&mut self, text: &str) -> Result<(), ChannelError> {
        debug!("{}: send {:?}", self.host, text);
        self.write(text.as_bytes()).await
    }

    /// Send a line.
    pub async fn send_line(&mut self, line: &str) -> Result<(), ChannelError> {
        debug!("{}: send line {:?}", self.host, line);
        self.write(format!("{}\n", line).as_bytes()).await
    }

    /// Send a line that must never appear in logs.
    pub async fn send_hidden_line(&mut self, line: &str) -> Result<(), ChannelError> {
        debug!("{}: send line <hidden>", self.host);
        self.write(format!("{}\n", line).as_bytes()).await
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), ChannelError> {
        let transport = self.transport.as_mut().ok_or(ChannelError::Closed)?;
        transport.send(data).await
    }

    /// Race `candidates` against the stream using the default timeout.
    pub async fn expect(&mut self, candidates: &[&PromptPattern]) -> Result<Expect, ChannelError> {
        self.expect_any(candidates, self.timeout).await
    }

    /// Race `candidates` against the stream.
    ///
    /// Blocks until a candidate matches, `timeout` elapses, or the remote
    /// closes the stream. Candidates are tried in order and the first one
    /// that matches wins, regardless of where in the output it matched.
    /// On a match the output up to and including the match is consumed.
    pub async fn expect_any(
        &mut self,
        candidates: &[&PromptPattern],
        timeout: Duration,
    ) -> Result<Expect, ChannelError> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(hit) = self.buffer.find_first(candidates) {
                let (before, matched) = self.buffer.consume(&hit);
                let result = PromptMatch {
                    index: hit.index,
                    kind: hit.kind,
                    before,
                    matched: String::from_utf8_lossy(&matched).into_owned(),
                };
                trace!(
                    "{}: matched {:?} {:?} after {} bytes",
                    self.host,
                    result.kind,
                    result.matched,
                    result.before.len()
                );
                return Ok(Expect::Matched(result));
            }

            if self.eof {
                debug!("{}: end of stream", self.host);
                return Ok(Expect::Eof {
                    pending: self.buffer.take(),
                });
            }

            let transport = self.transport.as_mut().ok_or(ChannelError::Closed)?;
            match tokio::time::timeout_at(deadline, transport.recv()).await {
                Ok(Ok(Some(chunk))) => {
                    trace!("{}: received {} bytes", self.host, chunk.len());
                    self.buffer.extend(&chunk);
                }
                Ok(Ok(None)) => self.eof = true,
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    debug!("{}: no prompt match within {:?}", self.host, timeout);
                    return Ok(Expect::Timeout {
                        pending: self.buffer.take(),
                    });
                }
            }
        }
    }

    /// Release the transport.
    pub async fn close(mut self) -> Result<(), ChannelError> {
        match self.transport.take() {
            Some(transport) => {
                debug!("{}: closing session", self.host);
                transport.close().await
            }
            None => Ok(()),
        }
    }
}

impl<T: Transport> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host)
            .field("open", &self.transport.is_some())
            .field("buffered", &self.buffer.len())
            .field("timeout", &self.timeout)
            .field("eof", &self.eof)
            .field("exec_mode", &self.exec_mode)
            .finish()
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        if self.transport.is_some() {
            warn!("Session for {} dropped without close()", self.host);
        }
    }
}
