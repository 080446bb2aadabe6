//! Per-host workflow and the bounded-concurrency batch around it.
//!
//! One host runs strictly sequentially: connect, configure, capture,
//! clean, persist. Hosts are independent of each other; any failure is
//! caught at the host boundary, logged, and recorded in that host's
//! [`HostReport`] while the rest of the batch carries on.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use futures_util::stream;
use log::{error, info, warn};

use crate::channel::{PromptSet, Session};
use crate::driver::{Ack, ConfigPlan, apply_config, connect, execute};
use crate::error::{ChannelError, ConfigError, HostError, Result};
use crate::job::JobConfig;
use crate::normalize::clean;
use crate::sink::OutputSink;
use crate::transport::{Connector, Credentials, Transport};

/// What happened to one host.
#[derive(Debug)]
pub struct HostReport {
    pub host: String,

    /// Per-statement results, if configuration completed.
    pub ack: Option<Ack>,

    /// Where the captured output went. Also set for a failed capture whose
    /// partial output could be saved.
    pub artifact: Option<PathBuf>,

    /// Why the host was skipped, if it was.
    pub error: Option<HostError>,

    pub elapsed: Duration,
}

impl HostReport {
    fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            ack: None,
            artifact: None,
            error: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Check if the host went through the whole workflow.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Reports for a whole batch, in host input order.
#[derive(Debug)]
pub struct BatchReport {
    pub hosts: Vec<HostReport>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &HostReport> {
        self.hosts.iter().filter(|r| r.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &HostReport> {
        self.hosts.iter().filter(|r| !r.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        self.hosts.iter().all(HostReport::is_success)
    }
}

/// Applies one job to hosts reached through `connector`, persisting
/// output through `sink`.
pub struct Workflow<C, S> {
    connector: C,
    sink: S,
    credentials: Credentials,
    job: JobConfig,
    prompts: PromptSet,
}

impl<C: Connector, S: OutputSink> Workflow<C, S> {
    /// Validate the job and compile its prompt patterns.
    pub fn new(connector: C, sink: S, credentials: Credentials, job: JobConfig) -> Result<Self> {
        job.validate()?;
        let prompts = job.prompts.compile().map_err(ChannelError::from)?;
        Ok(Self {
            connector,
            sink,
            credentials,
            job,
            prompts,
        })
    }

    pub fn job(&self) -> &JobConfig {
        &self.job
    }

    /// Run the workflow on every host, at most `job.concurrency` at once.
    pub async fn run(&self, hosts: &[String]) -> BatchReport {
        let start = Instant::now();
        info!(
            "Processing {} host(s), {} at a time",
            hosts.len(),
            self.job.concurrency
        );

        let reports: Vec<HostReport> = stream::iter(hosts)
            .map(|host| self.run_host(host))
            .buffered(self.job.concurrency)
            .collect()
            .await;

        let report = BatchReport {
            hosts: reports,
            elapsed: start.elapsed(),
        };
        info!(
            "Batch finished in {:?}: {} succeeded, {} failed",
            report.elapsed,
            report.succeeded().count(),
            report.failed().count()
        );
        report
    }

    /// Run the full workflow on one host. Never fails; the outcome is in
    /// the report.
    pub async fn run_host(&self, host: &str) -> HostReport {
        let start = Instant::now();
        let mut report = HostReport::new(host);

        let connected = connect(
            &self.connector,
            host,
            &self.credentials,
            &self.prompts,
            &self.job.timeouts,
        )
        .await;

        match connected {
            Ok(mut session) => {
                let result = self.drive(&mut session, &mut report).await;

                if result.is_ok() {
                    self.logout(&mut session).await;
                }
                if let Err(e) = session.close().await {
                    warn!("{}: error while closing session: {}", host, e);
                }
                report.error = result.err();
            }
            Err(e) => report.error = Some(e.into()),
        }

        if let Some(e) = &report.error {
            error!("Error processing switch {}: {}", host, e);
            if matches!(e, HostError::Config(c) if !matches!(c, ConfigError::EnterFailed)) {
                warn!("{}: configuration may be partially applied", host);
            }
        }

        report.elapsed = start.elapsed();
        report
    }

    async fn drive<T: Transport>(
        &self,
        session: &mut Session<T>,
        report: &mut HostReport,
    ) -> std::result::Result<(), HostError> {
        let plan = ConfigPlan {
            mode: &self.job.config_mode,
            timeouts: &self.job.timeouts,
            prompts: &self.prompts,
            failed_when_contains: &self.job.failed_when_contains,
        };
        let ack = apply_config(session, &self.job.commands, &plan).await?;
        for rejected in ack.rejected() {
            warn!(
                "{}: '{}' was rejected by the device",
                session.host(),
                rejected.command
            );
        }
        report.ack = Some(ack);

        let command = &self.job.capture_command;
        let captured = match execute(
            session,
            command,
            &self.prompts,
            &self.job.timeouts,
            self.job.max_pages,
        )
        .await
        {
            Ok(captured) => captured,
            Err(e) => {
                if let Some(partial) = e.partial() {
                    let cleaned = clean(partial, command);
                    match self.sink.write(session.host(), &cleaned).await {
                        Ok(path) => {
                            warn!(
                                "{}: incomplete output saved to {}",
                                session.host(),
                                path.display()
                            );
                            report.artifact = Some(path);
                        }
                        Err(sink_err) => {
                            warn!("{}: could not save partial output: {}", session.host(), sink_err)
                        }
                    }
                }
                return Err(e.into());
            }
        };

        let cleaned = clean(&captured, command);
        report.artifact = Some(self.sink.write(session.host(), &cleaned).await?);
        Ok(())
    }

    /// Fire-and-forget logout; the session is closed right after anyway.
    async fn logout<T: Transport>(&self, session: &mut Session<T>) {
        if let Some(command) = &self.job.logout_command {
            if let Err(e) = session.send_line(command).await {
                warn!("{}: logout failed: {}", session.host(), e);
            }
        }
    }
}
