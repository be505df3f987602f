//! Log initialization.
//!
//! Every run writes to a fresh timestamped file
//! (`<output_dir>/<prefix>_<YYYYmmdd_HHMMSS><ext>`) and, when enabled, to the
//! console. The filter is `--log-level` if given, else `RUST_LOG`, else the
//! configured level.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config_file::{parse_level, LoggingConfig};

/// Log file path for a run started at `started`.
pub fn log_file_path(config: &LoggingConfig, started: DateTime<Local>) -> PathBuf {
    config.output_dir.join(format!(
        "{}_{}{}",
        config.file_prefix,
        started.format("%Y%m%d_%H%M%S"),
        config.log_extension
    ))
}

fn build_filter(config: &LoggingConfig, level_override: Option<&str>) -> Result<EnvFilter> {
    if let Some(level) = level_override {
        let level = parse_level(level)?;
        return Ok(EnvFilter::new(level.as_str().to_ascii_lowercase()));
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let level = parse_level(&config.level)?;
    Ok(EnvFilter::new(level.as_str().to_ascii_lowercase()))
}

/// Installs the global subscriber and returns the log file path.
pub fn init_logging(config: &LoggingConfig, level_override: Option<&str>) -> Result<PathBuf> {
    let filter = build_filter(config, level_override)?;

    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("Failed to create log directory {}", config.output_dir.display())
    })?;
    let path = log_file_path(config, Local::now());
    let file = File::create(&path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file));
    let console_layer = config
        .enable_console
        .then(|| fmt::layer().with_target(false).compact());

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to set global logger")?;

    Ok(path)
}
