//! Where cleaned output ends up.

use std::future::Future;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::driver::CleanedOutput;
use crate::error::SinkError;

/// Artifact file name for `command` run on `host`.
///
/// Dots in the host become dashes and spaces in the command become
/// underscores, so `10.0.0.5` + `show running-config` gives
/// `10-0-0-5_show_running-config.txt`.
pub fn artifact_name(host: &str, command: &str) -> String {
    format!("{}_{}.txt", host.replace('.', "-"), command.replace(' ', "_"))
}

/// Destination for one host's cleaned output.
pub trait OutputSink: Send + Sync {
    /// Persist `output` for `host`, returning where it went.
    fn write(
        &self,
        host: &str,
        output: &CleanedOutput,
    ) -> impl Future<Output = Result<PathBuf, SinkError>> + Send;
}

/// Writes one text file per host into a directory.
///
/// Existing files with the same name are overwritten.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl OutputSink for DirectorySink {
    async fn write(&self, host: &str, output: &CleanedOutput) -> Result<PathBuf, SinkError> {
        let path = self.dir.join(artifact_name(host, &output.command));

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| SinkError::Write {
                path: self.dir.clone(),
                source,
            })?;

        debug!("{}: writing {} bytes", host, output.text.len());
        tokio::fs::write(&path, &output.text)
            .await
            .map_err(|source| SinkError::Write {
                path: path.clone(),
                source,
            })?;

        info!("Output from {} has been written to {}", host, path.display());
        Ok(path)
    }
}
