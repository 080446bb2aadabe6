//! Transport layer: duplex byte streams to a device's interactive shell.
//!
//! The drivers only see the [`Transport`] trait. [`SshConnector`] opens
//! real SSH sessions via russh; tests use a scripted in-memory device.

pub mod config;
#[cfg(test)]
pub(crate) mod mock;
mod ssh;

pub use config::{Credentials, HostKeyVerification, SshConfig};
pub use ssh::{SshConnector, SshTransport};

use std::future::Future;

use crate::error::{ChannelError, TransportError};

/// An open, exclusively owned byte stream to one host's shell.
pub trait Transport: Send {
    /// Write raw bytes to the remote shell.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Wait for the next chunk of output.
    ///
    /// Returns `Ok(None)` once the remote has closed the stream. Must be
    /// cancel-safe: callers race it against a timeout.
    fn recv(&mut self) -> impl Future<Output = Result<Option<Vec<u8>>, ChannelError>> + Send;

    /// Release the stream.
    fn close(self) -> impl Future<Output = Result<(), ChannelError>> + Send
    where
        Self: Sized;

    /// Whether credentials were already exchanged below the shell, so no
    /// in-band password prompt will appear.
    fn authenticated(&self) -> bool {
        false
    }
}

/// Opens transports to hosts.
pub trait Connector: Send + Sync {
    /// The transport type produced by this connector.
    type Transport: Transport;

    /// Open a transport to `host`.
    fn connect(
        &self,
        host: &str,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Self::Transport, TransportError>> + Send;
}
