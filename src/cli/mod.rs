//! Command-line interface for spotidal.
//!
//! This module provides the download pipeline and the maintenance commands
//! that inspect the cache, explain matches, and backfill lyrics.

mod commands;

pub use commands::{Cli, Commands, run_command};
