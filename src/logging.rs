//! Logging setup.
//!
//! Every run logs to the console and to a fresh
//! `spotidal-<YYYY-mm-dd_HH-MM-SS>.log` file in the configured log directory.
//! Only the newest `fileLimit` log files are kept.
//!
//! The level comes from `logging.level`; `RUST_LOG` overrides it entirely.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::LoggingConfig;

const LOG_PREFIX: &str = "spotidal-";
const LOG_SUFFIX: &str = ".log";

/// Crates whose logs are noise at info level
const QUIET_CRATES: [&str; 5] = ["hyper", "hyper_util", "reqwest", "rustls", "h2"];

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// whole program.
pub fn init(config: &LoggingConfig, log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    // Make room for the file this run is about to create
    let removed = prune_old_logs(log_dir, config.file_limit.saturating_sub(1))
        .with_context(|| format!("Failed to clean up logs in {}", log_dir.display()))?;

    let file_name = log_file_name(Local::now());
    let file_appender = tracing_appender::rolling::never(log_dir, &file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!(
        "Logging to {} ({} old log files removed)",
        log_dir.join(&file_name).display(),
        removed
    );
    Ok(guard)
}

/// Filter directives for a level, with HTTP internals capped at `warn`.
pub fn default_directives(level: &str) -> String {
    let mut directives = vec![level.to_string()];
    directives.extend(QUIET_CRATES.iter().map(|name| format!("{name}=warn")));
    directives.join(",")
}

fn log_file_name(now: DateTime<Local>) -> String {
    format!("{LOG_PREFIX}{}{LOG_SUFFIX}", now.format("%Y-%m-%d_%H-%M-%S"))
}

/// Delete the oldest log files so at most `keep` remain. Returns how many were removed.
///
/// File names embed a sortable timestamp, so name order is age order.
fn prune_old_logs(log_dir: &Path, keep: usize) -> std::io::Result<usize> {
    let mut logs: Vec<PathBuf> = std::fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(LOG_PREFIX) && name.ends_with(LOG_SUFFIX))
        })
        .collect();

    if logs.len() <= keep {
        return Ok(0);
    }
    logs.sort();

    let excess = logs.len() - keep;
    for path in &logs[..excess] {
        std::fs::remove_file(path)?;
    }
    Ok(excess)
}
