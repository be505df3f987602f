//! Routing table change tracker daemon.
//!
//! `check` runs one cycle and exits 0 (no change), 1 (change detected) or
//! 2 (error). `daemon` polls until SIGINT/SIGTERM.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use routewatch_stats::StatsCollector;
use routewatchd::{
    JsonLinesReporter, LogReporter, PollOrchestrator, ReporterSet, RouteSource, RouteWatchConfig,
    SnapshotStore, SourceAdapter,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Exit code for configuration and runtime errors.
const EXIT_ERROR: u8 = 2;

/// Routing table change tracker
#[derive(Parser, Debug)]
#[command(name = "routewatchd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short = 'c', long, global = true, default_value = "config.yaml")]
    config: PathBuf,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short = 'l', long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single check and exit
    Check,
    /// Poll continuously until interrupted
    Daemon {
        /// Seconds between checks, overriding poll.interval_seconds
        #[arg(short = 'i', long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            let message = format!("{:#}", e);
            // The subscriber may not be installed yet
            eprintln!("routewatchd: {}", message);
            error!(error = %message, "routewatchd: Exiting with error");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = RouteWatchConfig::load(&cli.config)
        .with_context(|| format!("Invalid configuration {}", cli.config.display()))?;

    let log_file = routewatchd::logging::init_logging(&config.logging, cli.log_level.as_deref())?;

    info!("{}", "=".repeat(60));
    info!("Routing Table Change Tracker Started");
    info!(mode = %config.mode(), "Mode: {}", config.mode());
    info!("Log file: {}", log_file.display());
    info!("{}", "=".repeat(60));

    let source = SourceAdapter::from_config(&config.source_config()?);
    info!(target_desc = %source.describe(), "Route source configured");

    let store = config
        .snapshot
        .store_previous
        .then(|| SnapshotStore::new(&config.snapshot.path));

    let log_reporter = LogReporter::new().with_top_ports(config.statistics.top_ports_count);
    let mut reporters = ReporterSet::new().with(log_reporter);
    if let Some(path) = &config.report.json_path {
        info!(path = %path.display(), "Writing JSON cycle reports");
        reporters = reporters.with(JsonLinesReporter::new(path));
    }

    let mut orchestrator = PollOrchestrator::new(source, reporters, store);
    if config.statistics.enabled {
        orchestrator = orchestrator.with_stats(StatsCollector::new(config.statistics.clone()));
    }

    match cli.command {
        Command::Check => {
            let outcome = orchestrator.run_cycle().await;
            info!(?outcome, "Check complete");
            Ok(ExitCode::from(outcome.exit_code()))
        }
        Command::Daemon { interval } => {
            let interval = interval.map_or_else(|| config.interval(), Duration::from_secs);
            anyhow::ensure!(!interval.is_zero(), "--interval must be > 0");

            let shutdown = setup_signal_handlers();
            orchestrator.run_continuous(interval, shutdown).await;
            info!("Graceful shutdown complete");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Cancels the returned token on SIGINT or SIGTERM.
fn setup_signal_handlers() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();

    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Received shutdown signal, stopping after the current cycle");
        cancel.cancel();
    });

    token
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            error!(error = %e, "Cannot install SIGTERM handler, listening for SIGINT only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
