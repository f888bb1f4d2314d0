//! # SRV Recorder
//!
//! Elects one leader among cooperating instances through a coordination
//! service lease and a compare-and-swap lock key, then lets only the leader
//! publish an SRV record describing current cluster membership.
//!
//! ## Flow
//! ```text
//! LeaseCache → LeaseManager → LockCoordinator → members → RecordPublisher
//!                    ↓               ↓
//!              Lease Store (Consul | Redis)
//! ```
//!
//! Each invocation runs to completion: exit 0 whether or not this instance
//! led, non-zero on any configuration or store failure.

use anyhow::Result;
use clap::Parser;
use recorder_common::RecorderError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cluster;
mod config;
mod dns;
mod lease;
mod lock;
mod state;
mod store;
mod updater;

use crate::config::{AppConfig, Backend};
use crate::state::AppState;
use crate::updater::{RunOutcome, SrvUpdater};

/// SRV Recorder - leader-elected SRV record publisher
#[derive(Parser, Debug)]
#[command(name = "srv-recorder")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/srv-recorder.toml")]
    config: String,

    /// Data directory holding the lease cache
    #[arg(short, long, env = "SRV_RECORDER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Lease Store backend (overrides config)
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Consul HTTP address (overrides config)
    #[arg(long, env = "CONSUL_HTTP_ADDR")]
    consul_addr: Option<String>,

    /// Consul ACL token (overrides config)
    #[arg(long, env = "CONSUL_HTTP_TOKEN", hide_env_values = true)]
    consul_token: Option<String>,

    /// Redis URL (overrides config)
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Datacenter segment of the lock key (discovered from Consul if unset)
    #[arg(long)]
    datacenter: Option<String>,

    /// Log the record instead of publishing it
    #[arg(long, default_value = "false")]
    dry_run: bool,

    /// Destroy the cached lease and exit
    #[arg(long, default_value = "false")]
    release: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    init_logging(&args.log_level, args.json_logs);

    info!("Starting SRV recorder v{}", env!("CARGO_PKG_VERSION"));

    match run(&args).await {
        Ok(outcome) => {
            info!(outcome = ?outcome, "Run complete");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %format!("{:#}", err), "Run failed");
            ExitCode::from(exit_code(&err))
        }
    }
}

async fn run(args: &Args) -> Result<RunOutcome> {
    let config = AppConfig::load(&args.config, args)?;
    info!(backend = ?config.backend, dry_run = config.dry_run, "Configuration loaded");

    let state = AppState::new(config).await?;
    let updater = SrvUpdater::new(&state);

    let outcome = if args.release {
        updater.release().await?
    } else {
        updater.update().await?
    };

    Ok(outcome)
}

/// Exit code for a failed run; anything that is not a typed error happened
/// while reading configuration
fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<RecorderError>())
        .map(RecorderError::exit_code)
        .unwrap_or(2)
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_exit_codes() {
        let config = anyhow::Error::new(RecorderError::Config("data_dir".into()));
        assert_eq!(exit_code(&config), 2);

        let store = Err::<(), _>(RecorderError::Store("refused".into()))
            .context("Failed to start")
            .unwrap_err();
        assert_eq!(exit_code(&store), 1);

        assert_eq!(exit_code(&anyhow::anyhow!("Failed to parse config")), 2);
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["srv-recorder", "-d", "/var/lib/srv-recorder"]);
        assert_eq!(args.config, "config/srv-recorder.toml");
        assert!(!args.release);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_backend_flag() {
        let args = Args::parse_from(["srv-recorder", "--backend", "redis"]);
        assert_eq!(args.backend, Some(Backend::Redis));
    }
}
