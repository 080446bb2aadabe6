//! SSH connection configuration.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys. Connection fails if the host
    /// is not already in known_hosts.
    Strict,

    /// Accept and auto-learn unknown keys, but reject changed keys.
    /// This is the default and matches answering "yes" to the client's
    /// confirmation question.
    #[default]
    AcceptNew,

    /// Accept all keys without checking. For testing and lab use only.
    Disabled,
}

/// Login credentials shared read-only by every host workflow.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    /// Create credentials from a username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// The login username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password. Never log the returned value.
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<hidden>")
            .finish()
    }
}

/// SSH connection settings shared by every host.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// SSH port (default: 22).
    pub port: u16,

    /// Timeout for TCP connect plus the SSH handshake.
    pub timeout: Duration,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file. `None` uses `~/.ssh/known_hosts`.
    pub known_hosts_path: Option<PathBuf>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            port: 22,
            timeout: Duration::from_secs(30),
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }
}

impl SshConfig {
    /// Get the socket address for connection.
    pub fn socket_addr(&self, host: &str) -> String {
        format!("{}:{}", host, self.port)
    }
}
