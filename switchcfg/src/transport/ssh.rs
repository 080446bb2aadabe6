//! SSH transport implementation using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::PublicKey;
use russh::{Channel, ChannelMsg};

use super::config::{Credentials, HostKeyVerification, SshConfig};
use super::{Connector, Transport};
use crate::error::{ChannelError, TransportError};

/// Opens password-authenticated SSH shells to switches.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use switchcfg::transport::{HostKeyVerification, SshConnector};
///
/// let connector = SshConnector::new()
///     .port(22)
///     .timeout(Duration::from_secs(10))
///     .host_key_verification(HostKeyVerification::Strict);
/// assert_eq!(connector.config().port, 22);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    config: SshConfig,
}

impl SshConnector {
    /// Create a connector with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a connector from explicit settings.
    pub fn with_config(config: SshConfig) -> Self {
        Self { config }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the connection timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set terminal dimensions.
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.config.terminal_width = width;
        self.config.terminal_height = height;
        self
    }

    /// Set the host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.config.host_key_verification = mode;
        self
    }

    /// Use a specific known_hosts file.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.known_hosts_path = Some(path.into());
        self
    }

    /// Get the connection settings.
    pub fn config(&self) -> &SshConfig {
        &self.config
    }
}

impl Connector for SshConnector {
    type Transport = SshTransport;

    async fn connect(
        &self,
        host: &str,
        credentials: &Credentials,
    ) -> Result<SshTransport, TransportError> {
        SshTransport::connect(host, &self.config, credentials).await
    }
}

/// SSH transport wrapping a russh session and its PTY shell channel.
pub struct SshTransport {
    /// The russh session handle.
    session: Handle<SshHandler>,

    /// The interactive shell channel.
    channel: Channel<Msg>,
}

impl SshTransport {
    /// Connect, authenticate, and open an interactive shell.
    pub async fn connect(
        host: &str,
        config: &SshConfig,
        credentials: &Credentials,
    ) -> Result<Self, TransportError> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(config.timeout),
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: host.to_string(),
            port: config.port,
            host_key_verification: config.host_key_verification.clone(),
            known_hosts_path: config.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };

        debug!("ssh: connecting to {}", config.socket_addr(host));

        let mut session = tokio::time::timeout(
            config.timeout,
            client::connect(ssh_config, (host, config.port), handler),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.timeout))?
        .map_err(|e| {
            // Prefer the detailed host key error stored by check_server_key
            // over the generic russh::Error::UnknownKey.
            if let Some(hk_err) = host_key_error.lock().ok().and_then(|mut slot| slot.take()) {
                return hk_err;
            }
            match e {
                russh::Error::IO(source) => TransportError::ConnectionFailed {
                    host: host.to_string(),
                    port: config.port,
                    source,
                },
                other => TransportError::Ssh(other),
            }
        })?;

        let authenticated = session
            .authenticate_password(credentials.username(), credentials.password())
            .await?
            .success();

        if !authenticated {
            return Err(TransportError::AuthenticationFailed {
                user: credentials.username().to_string(),
            });
        }

        let channel = session.channel_open_session().await?;

        channel
            .request_pty(
                true,
                "xterm",
                config.terminal_width,
                config.terminal_height,
                0,
                0,
                &[],
            )
            .await?;

        channel.request_shell(true).await?;

        debug!("ssh: shell open on {}", host);

        Ok(Self { session, channel })
    }
}

impl Transport for SshTransport {
    async fn send(&mut self, data: &[u8]) -> Result<(), ChannelError> {
        self.channel.data(data).await.map_err(ChannelError::Ssh)
    }

    async fn recv(&mut self) -> Result<Option<Vec<u8>>, ChannelError> {
        loop {
            match self.channel.wait().await {
                Some(ChannelMsg::Data { data }) => return Ok(Some(data.to_vec())),
                Some(ChannelMsg::ExtendedData { data, .. }) => return Ok(Some(data.to_vec())),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => return Ok(None),
                Some(_) => continue,
            }
        }
    }

    async fn close(self) -> Result<(), ChannelError> {
        if let Err(e) = self.channel.eof().await {
            debug!("ssh: eof on close failed: {}", e);
        }
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(ChannelError::Ssh)
    }

    fn authenticated(&self) -> bool {
        true
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Stores a detailed host-key error so connect() can surface it
    /// instead of the generic russh::Error::UnknownKey.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// Check the host key against known_hosts.
    ///
    /// Returns `Ok(true)` if matched, `Ok(false)` if host not found,
    /// `Err(TransportError::HostKeyChanged)` if key changed.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> Result<bool, TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::check_known_hosts(&self.host, self.port, pubkey)
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    /// Save a new host key to known_hosts.
    fn learn_host_key(&self, pubkey: &PublicKey) -> Result<(), TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey)
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    fn reject(&self, error: TransportError) -> bool {
        if let Ok(mut slot) = self.host_key_error.lock() {
            *slot = Some(error);
        }
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        match self.host_key_verification {
            HostKeyVerification::Disabled => Ok(true),

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => {
                    // Unknown host: learn the key
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key for {}: {}", self.host, e);
                    }
                    Ok(true)
                }
                Err(e) => Ok(self.reject(e)),
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => Ok(self.reject(TransportError::HostKeyUnknown {
                    host: self.host.clone(),
                    port: self.port,
                })),
                Err(e) => Ok(self.reject(e)),
            },
        }
    }
}
