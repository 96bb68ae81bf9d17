//! Casework Daemon - deadline sweeping for licence cases
//!
//! The daemon:
//! - Loads the case store (in memory, optionally seeded from a snapshot)
//! - Sweeps deadlines on an interval and raises overdue alerts
//! - Writes the snapshot back on shutdown

use anyhow::Context;
use casework_daemon::{Daemon, DaemonConfig};
use clap::Parser;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Casework Daemon CLI
#[derive(Parser)]
#[command(name = "caseworkd")]
#[command(about = "Casework Daemon - licence case deadline sweeper", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CASEWORK_CONFIG")]
    config: Option<String>,

    /// Log level
    #[arg(long, env = "CASEWORK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "CASEWORK_LOG_JSON")]
    json: bool,

    /// Sweep interval in seconds, overriding the configuration
    #[arg(long, env = "CASEWORK_SWEEP_INTERVAL")]
    sweep_interval: Option<u64>,

    /// Run a single sweep and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = DaemonConfig::load(cli.config.as_deref())
        .with_context(|| format!("loading configuration {:?}", cli.config))?;

    // Initialize tracing
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into());

    if cli.json || config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        actors = config.directory.actors.len(),
        "Starting caseworkd"
    );

    let mut daemon = Daemon::new(config).context("initialising daemon")?;
    if let Some(secs) = cli.sweep_interval {
        daemon = daemon.with_sweep_interval(Duration::from_secs(secs.max(1)));
    }

    if cli.once {
        let alerts = daemon.run_once().await.context("running sweep")?;
        tracing::info!(alerts = alerts.len(), "Single sweep finished");
        return Ok(());
    }

    daemon.run().await.context("running daemon")
}
