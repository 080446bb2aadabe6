//! Bulk-configure switches listed in a host file and save their running
//! configuration.
//!
//! ```text
//! HP_SWITCH_USER=manager HP_SWITCH_PASS=... switchcfg --job baseline.json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::{error, info};
use switchcfg::job::read_hosts;
use switchcfg::{
    Credentials, DirectorySink, HostKeyVerification, JobConfig, SshConnector, Workflow,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum HostKeyPolicy {
    /// Only connect to hosts already in known_hosts.
    Strict,
    /// Learn unknown keys, reject changed ones.
    AcceptNew,
    /// Accept any key.
    Disabled,
}

impl From<HostKeyPolicy> for HostKeyVerification {
    fn from(policy: HostKeyPolicy) -> Self {
        match policy {
            HostKeyPolicy::Strict => HostKeyVerification::Strict,
            HostKeyPolicy::AcceptNew => HostKeyVerification::AcceptNew,
            HostKeyPolicy::Disabled => HostKeyVerification::Disabled,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "switchcfg",
    version,
    about = "Apply configuration to HP/Aruba switches over SSH and save their running config"
)]
struct Cli {
    /// File with one switch address per line.
    #[arg(long, value_name = "PATH", default_value = "switch_ip.txt")]
    hosts: PathBuf,

    /// Login username.
    #[arg(long, env = "HP_SWITCH_USER")]
    user: Option<String>,

    /// Login password.
    #[arg(long, env = "HP_SWITCH_PASS", hide_env_values = true)]
    password: Option<String>,

    /// JSON job file with the statements to apply. Defaults apply no
    /// statements and only capture the running config.
    #[arg(long, value_name = "PATH")]
    job: Option<PathBuf>,

    /// Directory the per-host output files are written to.
    #[arg(long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// SSH port.
    #[arg(long, default_value_t = 22)]
    port: u16,

    /// Hosts processed at the same time. Overrides the job file.
    #[arg(long)]
    concurrency: Option<usize>,

    #[arg(long, value_enum, default_value_t = HostKeyPolicy::AcceptNew)]
    host_key_policy: HostKeyPolicy,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let (Some(user), Some(password)) = (cli.user.clone(), cli.password.clone()) else {
        error!("Credentials missing: set HP_SWITCH_USER and HP_SWITCH_PASS or pass --user/--password");
        return ExitCode::FAILURE;
    };

    let hosts = match read_hosts(&cli.hosts) {
        Ok(hosts) => hosts,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let job = match &cli.job {
        Some(path) => JobConfig::from_json_file(path),
        None => Ok(JobConfig::new()),
    };
    let mut job = match job {
        Ok(job) => job,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(concurrency) = cli.concurrency {
        job = job.with_concurrency(concurrency);
    }

    let connector = SshConnector::new()
        .port(cli.port)
        .timeout(job.timeouts.connect)
        .host_key_verification(cli.host_key_policy.into());

    let workflow = match Workflow::new(
        connector,
        DirectorySink::new(&cli.output_dir),
        Credentials::new(user, password),
        job,
    ) {
        Ok(workflow) => workflow,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Loaded {} host(s) from {}", hosts.len(), cli.hosts.display());
    let report = workflow.run(&hosts).await;

    for host in report.failed() {
        if let Some(e) = &host.error {
            error!("{}: {}", host.host, e);
        }
    }

    ExitCode::SUCCESS
}
