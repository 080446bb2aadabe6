//! Scripted in-memory device for driving the state machines in tests.
//!
//! A [`MockTransport`] delivers an optional greeting, then answers each
//! expected write with a canned reply, in order. Writes that do not match
//! the next scripted input are recorded but get no reply, so the device
//! simply goes silent and the caller's wait times out.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};

use super::config::Credentials;
use super::{Connector, Transport};
use crate::error::{ChannelError, TransportError};

/// Everything the code under test did to a mock transport.
#[derive(Debug, Default)]
pub(crate) struct MockLog {
    pub writes: Vec<String>,
    pub closes: usize,
}

pub(crate) struct MockTransport {
    pending: VecDeque<Vec<u8>>,
    script: VecDeque<(String, Vec<u8>)>,
    eof_when_idle: bool,
    authenticated: bool,
    log: Arc<Mutex<MockLog>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            script: VecDeque::new(),
            eof_when_idle: false,
            authenticated: false,
            log: Arc::new(Mutex::new(MockLog::default())),
        }
    }

    /// Output available before anything is written.
    pub fn greeting(self, output: &str) -> Self {
        self.greeting_bytes(output.as_bytes())
    }

    /// Raw greeting, for output that is not valid UTF-8.
    pub fn greeting_bytes(mut self, output: &[u8]) -> Self {
        self.pending.push_back(output.to_vec());
        self
    }

    /// Reply with `output` when exactly `input` is written.
    pub fn on(self, input: &str, output: &str) -> Self {
        self.on_bytes(input, output.as_bytes())
    }

    /// Reply with raw bytes when exactly `input` is written.
    pub fn on_bytes(mut self, input: &str, output: &[u8]) -> Self {
        self.script.push_back((input.to_string(), output.to_vec()));
        self
    }

    /// Reply with `output` when `line` plus a newline is written.
    pub fn on_line(self, line: &str, output: &str) -> Self {
        self.on(&format!("{}\n", line), output)
    }

    /// Report end of stream instead of going silent once idle.
    pub fn then_eof(mut self) -> Self {
        self.eof_when_idle = true;
        self
    }

    /// Behave like a transport that authenticated below the shell.
    pub fn pre_authenticated(mut self) -> Self {
        self.authenticated = true;
        self
    }

    pub fn log(&self) -> Arc<Mutex<MockLog>> {
        self.log.clone()
    }
}

/// Lock a mock log, tolerating poisoning from a failed assertion.
pub(crate) fn lock(log: &Mutex<MockLog>) -> std::sync::MutexGuard<'_, MockLog> {
    log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<(), ChannelError> {
        let text = String::from_utf8_lossy(data).into_owned();
        let matches = self
            .script
            .front()
            .is_some_and(|(expected, _)| *expected == text);
        lock(&self.log).writes.push(text);

        if matches {
            if let Some((_, reply)) = self.script.pop_front() {
                if !reply.is_empty() {
                    self.pending.push_back(reply);
                }
            }
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<Vec<u8>>, ChannelError> {
        if let Some(chunk) = self.pending.pop_front() {
            return Ok(Some(chunk));
        }
        if self.eof_when_idle {
            return Ok(None);
        }
        std::future::pending().await
    }

    async fn close(self) -> Result<(), ChannelError> {
        lock(&self.log).closes += 1;
        Ok(())
    }

    fn authenticated(&self) -> bool {
        self.authenticated
    }
}

/// Hands out pre-scripted transports by host name. Unknown hosts refuse
/// the connection.
pub(crate) struct MockConnector {
    devices: Mutex<HashMap<String, MockTransport>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            devices: Mutex::new(HashMap::new()),
        }
    }

    pub fn device(self, host: &str, transport: MockTransport) -> Self {
        if let Ok(mut devices) = self.devices.lock() {
            devices.insert(host.to_string(), transport);
        }
        self
    }
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(
        &self,
        host: &str,
        _credentials: &Credentials,
    ) -> Result<MockTransport, TransportError> {
        let transport = self
            .devices
            .lock()
            .ok()
            .and_then(|mut devices| devices.remove(host));
        transport.ok_or_else(|| TransportError::ConnectionFailed {
            host: host.to_string(),
            port: 22,
            source: io::ErrorKind::ConnectionRefused.into(),
        })
    }
}
