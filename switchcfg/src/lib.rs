//! # switchcfg
//!
//! Async bulk configuration of HP/Aruba switches over interactive SSH.
//!
//! For every host in a list, switchcfg logs in through the device's
//! interactive shell, applies an ordered list of configuration statements,
//! saves, captures the paginated output of a show command, strips terminal
//! control sequences from it and writes it to one file per host.
//!
//! ## Features
//!
//! - Async SSH sessions via russh
//! - Ordered prompt racing over a pattern buffer, with timeout and end of
//!   stream as ordinary outcomes
//! - Explicit state machines for login, configuration mode and pagination
//! - Bounded host concurrency; one failing host never stops the batch
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use switchcfg::{Credentials, DirectorySink, JobConfig, SshConnector, Workflow};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), switchcfg::Error> {
//!     let job = JobConfig::new()
//!         .with_command("no tftp client")
//!         .with_command("logging 192.0.2.10");
//!
//!     let workflow = Workflow::new(
//!         SshConnector::new(),
//!         DirectorySink::new("output"),
//!         Credentials::new("manager", "secret"),
//!         job,
//!     )?;
//!
//!     let hosts = switchcfg::job::read_hosts("switch_ip.txt")?;
//!     let report = workflow.run(&hosts).await;
//!     for host in report.failed() {
//!         eprintln!("{} failed", host.host);
//!     }
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod driver;
pub mod error;
pub mod job;
pub mod normalize;
pub mod sink;
pub mod transport;
pub mod workflow;

// Re-export main types for convenience
pub use driver::{Ack, CapturedOutput, CleanedOutput, StatementResult};
pub use error::{Error, HostError};
pub use job::{JobConfig, Timeouts};
pub use sink::{DirectorySink, OutputSink};
pub use transport::{Credentials, HostKeyVerification, SshConfig, SshConnector};
pub use workflow::{BatchReport, HostReport, Workflow};
