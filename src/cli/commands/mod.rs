//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `download`: The playlist download pipeline
//! - `matching`: Explain how one track would be matched
//! - `status`: Completion cache statistics
//! - `lyrics`: Lyrics backfill for finished downloads
//! - `init`: Default config generation

mod download;
mod init;
mod lyrics;
mod matching;
mod status;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::runtime::Runtime;
use tracing_appender::non_blocking::WorkerGuard;

use crate::config::{self, Config};
use crate::logging;

pub use download::cmd_download;
pub use init::cmd_init_config;
pub use lyrics::cmd_lyrics;
pub use matching::cmd_match;
pub use status::cmd_status;

/// Download a Spotify playlist export from Tidal
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: ./config.toml, then the user config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Download every playlist entry that is not cached yet (default)
    Download {
        /// Retry entries that previously failed permanently
        #[arg(long)]
        retry_failed: bool,
        /// Delete downloads that are no longer in the playlist
        #[arg(long)]
        sync: bool,
    },
    /// Show how a single track would be matched, without downloading
    Match {
        /// Track title
        #[arg(long)]
        title: String,
        /// Artist name; separate several artists with ';'
        #[arg(long)]
        artist: String,
        /// Album name
        #[arg(long)]
        album: Option<String>,
        /// Track length in seconds
        #[arg(long)]
        duration: Option<u32>,
    },
    /// Show completion cache statistics and failed tracks
    Status,
    /// Fetch lyrics for completed downloads that have none
    Lyrics,
    /// Write a default config file
    InitConfig {
        /// Where to write (default: the resolved config path)
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run the specified CLI command, defaulting to `download`.
///
/// A missing or invalid config aborts before any work starts.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    if let Some(Commands::InitConfig { path, force }) = &cli.command {
        let target = path
            .clone()
            .unwrap_or_else(|| config::resolve_path(cli.config.as_deref()));
        return cmd_init_config(&target, *force);
    }

    let (config, created) = load_config(cli.config.as_deref())?;
    let _guard = start_logging(&config)?;
    if created {
        tracing::info!("Started with a default config");
    }
    let rt = Runtime::new()?;

    match &cli.command {
        Some(Commands::Download { retry_failed, sync }) => {
            cmd_download(&rt, &config, *retry_failed, *sync)
        }
        None => cmd_download(&rt, &config, false, false),
        Some(Commands::Match {
            title,
            artist,
            album,
            duration,
        }) => cmd_match(&rt, &config, title, artist, album.as_deref(), *duration),
        Some(Commands::Status) => cmd_status(&config),
        Some(Commands::Lyrics) => cmd_lyrics(&rt, &config),
        Some(Commands::InitConfig { .. }) => Ok(()),
    }
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// Resolve, load, and validate the config file.
///
/// Runs before logging is set up, so writing a default config is reported on
/// stderr. The flag tells whether that happened.
pub(crate) fn load_config(explicit: Option<&Path>) -> anyhow::Result<(Config, bool)> {
    let path = config::resolve_path(explicit);
    let created = !path.exists();
    let config = config::load_or_create(&path)
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    if created {
        eprintln!("No config file found, wrote defaults to {}", path.display());
    }
    Ok((config, created))
}

fn start_logging(config: &Config) -> anyhow::Result<WorkerGuard> {
    logging::init(&config.logging, &config.paths.log_path)
}
