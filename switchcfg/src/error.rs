//! Error types for switchcfg.
//!
//! Each layer has its own error enum. Failures inside one host's workflow
//! are collected into [`HostError`] so a batch can report them and move on.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::driver::CapturedOutput;

/// Main error type for switchcfg operations outside a single host workflow.
#[derive(Error, Debug)]
pub enum Error {
    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Invalid job configuration
    #[error("Invalid job configuration: {message}")]
    InvalidJob { message: String },

    /// Failed to read a job or host list file
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Host key not present in known_hosts (strict mode)
    #[error("Unknown host key for {host}:{port}")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key does not match the known_hosts entry
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Channel layer errors (reading and writing the interactive stream).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Channel closed, or already released
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Failures while driving a session from "just connected" to a prompt.
#[derive(Error, Debug)]
pub enum ConnectError {
    /// The transport could not be opened.
    #[error("transport unreachable: {0}")]
    TransportUnreachable(#[source] TransportError),

    /// A host key question was answered but no password request followed.
    #[error("unexpected handshake: no password request after host key confirmation")]
    UnexpectedHandshake,

    /// Neither a password request nor a host key question arrived.
    #[error("no response from host (timeout or end of stream)")]
    NoResponse,

    /// A banner was acknowledged but no prompt followed.
    #[error("no prompt after banner")]
    NoPromptAfterBanner,

    /// Credentials were sent but no prompt followed.
    #[error("no prompt after login")]
    NoPromptAfterLogin,

    /// Writing to or reading from the channel failed.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Failures of a paginated command execution.
///
/// Where possible the output accumulated so far is carried along so
/// callers can persist it.
#[derive(Error, Debug)]
pub enum ExecError {
    /// No pagination marker or prompt arrived before the timeout.
    #[error("command '{}' stalled after {} page(s)", .partial.command(), .partial.pages())]
    Stalled { partial: CapturedOutput },

    /// The remote closed the stream mid-command.
    #[error("session closed while running '{command}'")]
    SessionClosed { command: String },

    /// The configured page cap was reached.
    #[error("command '{}' exceeded the limit of {limit} page(s)", .partial.command())]
    PageLimit {
        limit: usize,
        partial: CapturedOutput,
    },

    /// Writing to or reading from the channel failed.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl ExecError {
    /// Output captured before the failure, if any survived.
    pub fn partial(&self) -> Option<&CapturedOutput> {
        match self {
            ExecError::Stalled { partial } | ExecError::PageLimit { partial, .. } => Some(partial),
            ExecError::SessionClosed { .. } | ExecError::Channel(_) => None,
        }
    }
}

/// Failures of the configuration-mode driver.
///
/// Statements applied before the failure are not rolled back.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration prompt never appeared after the entry command.
    #[error("failed to enter configuration mode")]
    EnterFailed,

    /// Statement `index` was not confirmed by a configuration prompt.
    #[error("configuration statement {index} ('{command}') failed")]
    CommandFailed { index: usize, command: String },

    /// No exec prompt after leaving configuration mode.
    #[error("failed to exit configuration mode")]
    ExitFailed,

    /// No exec prompt after the save command.
    #[error("failed to save configuration")]
    SaveFailed,

    /// Writing to or reading from the channel failed.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Output sink errors.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The artifact could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Everything that can end one host's workflow early.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("connect: {0}")]
    Connect(#[from] ConnectError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("capture: {0}")]
    Exec(#[from] ExecError),

    #[error("output: {0}")]
    Sink(#[from] SinkError),
}

/// Result type alias using switchcfg's Error.
pub type Result<T> = std::result::Result<T, Error>;
