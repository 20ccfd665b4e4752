//! spotidal - Download a Spotify playlist export from Tidal.
//!
//! Reads an exported playlist CSV, matches every track against the Tidal
//! catalog, and downloads the matches with tags and lyrics. A completion
//! cache makes re-runs pick up only what is new.

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod downloader;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod metadata;
pub mod model;
pub mod playlist;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    cli::run_command(&args)
}
