//! Job configuration: what to apply, what to capture, and how patiently.
//!
//! A job is plain data shared read-only by every host workflow. It can be
//! built in code with the `with_*` methods or loaded from a JSON file:
//!
//! ```json
//! {
//!   "commands": ["conf t", "no tftp client", "logging 192.0.2.10"],
//!   "capture_command": "show running-config",
//!   "timeouts": { "save": 45.0 },
//!   "concurrency": 8
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::channel::PromptConfig;
use crate::error::{Error, Result};

/// Per-wait timeouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Waiting for the first login prompt; also the session default used
    /// after acknowledging a banner.
    #[serde(with = "duration_secs")]
    pub connect: Duration,

    /// Waiting for a prompt or banner after sending the password.
    #[serde(with = "duration_secs")]
    pub login: Duration,

    /// Waiting for each page (or the final prompt) of a captured command.
    #[serde(with = "duration_secs")]
    pub page: Duration,

    /// Entering configuration mode and confirming each statement.
    #[serde(with = "duration_secs")]
    pub config: Duration,

    /// Leaving configuration mode.
    #[serde(with = "duration_secs")]
    pub exit: Duration,

    /// Persisting the configuration.
    #[serde(with = "duration_secs")]
    pub save: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            login: Duration::from_secs(20),
            page: Duration::from_secs(15),
            config: Duration::from_secs(10),
            exit: Duration::from_secs(10),
            save: Duration::from_secs(30),
        }
    }
}

impl Timeouts {
    /// Use the same timeout for every wait.
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            connect: timeout,
            login: timeout,
            page: timeout,
            config: timeout,
            exit: timeout,
            save: timeout,
        }
    }
}

/// Commands that move the device in and out of configuration mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigModeCommands {
    pub enter: String,
    pub exit: String,
    pub save: String,
}

impl Default for ConfigModeCommands {
    fn default() -> Self {
        Self {
            enter: "configure terminal".to_string(),
            exit: "exit".to_string(),
            save: "write memory".to_string(),
        }
    }
}

/// Everything a batch run needs besides hosts and credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Configuration statements, applied verbatim and in order.
    pub commands: Vec<String>,

    /// Command whose paginated output is captured after configuring.
    pub capture_command: String,

    /// Configuration-mode entry, exit and save commands.
    pub config_mode: ConfigModeCommands,

    /// Sent after a successful capture, before the session is closed.
    pub logout_command: Option<String>,

    /// Device messages that mark a configuration statement as rejected.
    pub failed_when_contains: Vec<String>,

    /// Stop a capture after this many pages. `None` means unbounded.
    pub max_pages: Option<usize>,

    /// Number of hosts processed at the same time.
    pub concurrency: usize,

    pub timeouts: Timeouts,

    pub prompts: PromptConfig,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            capture_command: "show running-config".to_string(),
            config_mode: ConfigModeCommands::default(),
            logout_command: Some("exit".to_string()),
            failed_when_contains: vec![
                "Invalid input".to_string(),
                "Ambiguous input".to_string(),
                "Incomplete input".to_string(),
            ],
            max_pages: None,
            concurrency: 4,
            timeouts: Timeouts::default(),
            prompts: PromptConfig::default(),
        }
    }
}

impl JobConfig {
    /// Create a job with default settings and no statements.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a job from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let job: JobConfig = serde_json::from_str(text).map_err(|e| Error::InvalidJob {
            message: e.to_string(),
        })?;
        job.validate()?;
        Ok(job)
    }

    /// Load a job from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::InvalidJob {
                message: "concurrency must be at least 1".to_string(),
            });
        }
        if self.capture_command.trim().is_empty() {
            return Err(Error::InvalidJob {
                message: "capture_command must not be empty".to_string(),
            });
        }
        if self.max_pages == Some(0) {
            return Err(Error::InvalidJob {
                message: "max_pages must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Add a configuration statement.
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.commands.push(command.into());
        self
    }

    /// Replace the configuration statements.
    pub fn with_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands = commands.into_iter().map(Into::into).collect();
        self
    }

    /// Set the command whose output is captured.
    pub fn with_capture_command(mut self, command: impl Into<String>) -> Self {
        self.capture_command = command.into();
        self
    }

    /// Set the timeouts.
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Cap the number of pages per capture.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Set how many hosts run at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set or clear the logout command.
    pub fn with_logout_command(mut self, command: Option<String>) -> Self {
        self.logout_command = command;
        self
    }
}

/// Parse a newline-delimited host list, ignoring blank lines.
pub fn parse_hosts(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read and parse a host list file.
pub fn read_hosts(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_hosts(&text))
}

/// Durations as (fractional) seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}
