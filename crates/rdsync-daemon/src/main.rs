//! rdsync Daemon - Scheduled account replication service
//!
//! This binary loads the YAML configuration and runs every configured sync
//! job on its schedule until it receives SIGTERM or SIGINT.
//!
//! # Architecture
//!
//! The daemon hands the configuration to a [`JobManager`], starts it, then
//! waits on a `CancellationToken` that the signal handler triggers. On
//! shutdown the manager closes all jobs within the configured timeout.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use rdsync_core::config::{Config, LogFormat, LoggingConfig};
use rdsync_core::events;
use rdsync_sync::manager::JobManager;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Levels from quietest to most verbose
const LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Filter directives added when HTTP client logging is disabled
const QUIET_HTTP_DIRECTIVES: &[&str] = &["reqwest=warn", "hyper=warn", "hyper_util=warn"];

#[derive(Debug, Parser)]
#[command(
    name = "rdsyncd",
    version,
    about = "Replicates torrents between Real-Debrid accounts on a schedule"
)]
struct Args {
    /// Use alternate config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// More verbose logging (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

// ============================================================================
// Configuration
// ============================================================================

/// Resolves, loads and validates the configuration
fn load_config(explicit: Option<&Path>) -> Result<(PathBuf, Config)> {
    let path = Config::resolve_path(explicit)?;
    let config = Config::load(&path)?;

    let errors = config.validate();
    if !errors.is_empty() {
        let details: Vec<String> = errors.iter().map(|e| format!("  - {e}")).collect();
        anyhow::bail!(
            "Invalid configuration in {}:\n{}",
            path.display(),
            details.join("\n")
        );
    }

    Ok((path, config))
}

// ============================================================================
// Logging
// ============================================================================

/// The configured level raised by `verbose` steps
fn effective_level(log: &LoggingConfig, verbose: u8) -> &'static str {
    let configured = log.level_directive().unwrap_or("info");
    let base = LEVELS.iter().position(|l| *l == configured).unwrap_or(2);
    let index = (base + usize::from(verbose)).min(LEVELS.len() - 1);
    LEVELS[index]
}

/// Filter directives used when `RUST_LOG` is not set
fn filter_directives(config: &Config, verbose: u8) -> String {
    let mut directives = vec![effective_level(&config.log, verbose)];
    if config.api.disable_http_logging {
        directives.extend_from_slice(QUIET_HTTP_DIRECTIVES);
    }
    directives.join(",")
}

fn init_tracing(config: &Config, verbose: u8) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config, verbose)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    match config.log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

// ============================================================================
// Signal handling
// ============================================================================

/// Waits for SIGINT or SIGTERM, then cancels `token`
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config_path, config) =
        load_config(args.config.as_deref()).context("Failed to load configuration")?;

    if args.check {
        println!(
            "Configuration OK: {} ({} accounts, {} sync jobs)",
            config_path.display(),
            config.accounts.len(),
            config.syncs.len()
        );
        return Ok(());
    }

    init_tracing(&config, args.verbose);
    info!(
        event = events::APP_STARTING,
        config_path = %config_path.display(),
        jobs = config.syncs.len(),
        "rdsync daemon starting (rdsyncd)"
    );

    let shutdown_timeout = Duration::from_secs(config.scheduler.shutdown_timeout_secs);
    let manager = Arc::new(JobManager::new(config));

    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    manager.start().await;
    shutdown_token.cancelled().await;

    info!(event = events::SHUTDOWN_INITIATED, "Shutdown initiated");
    manager.stop(shutdown_timeout).await;
    manager.wait_for_shutdown().await;
    info!(event = events::SHUTDOWN_COMPLETE, "rdsync daemon shut down gracefully");

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
