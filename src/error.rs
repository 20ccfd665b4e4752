//! Application-wide error types.
//!
//! This module provides a unified error hierarchy for the application.
//! Library modules use specific error types via `thiserror`, while
//! CLI/main uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: Top-level application error enum
//! - [`DownloadError`]: Per-job failures; recorded in the cache, never fatal
//! - Module-specific errors (e.g., [`CatalogError`], [`ConfigError`]) for detailed handling
//!
//! # Example
//!
//! ```ignore
//! use spotidal::error::{Error, Result};
//!
//! fn prepare(path: &Path) -> Result<Config> {
//!     let config = config::load_or_create(path)?; // Config errors auto-convert
//!     std::fs::create_dir_all(&config.paths.download_path)?; // IO errors auto-convert
//!     Ok(config)
//! }
//! ```

use std::path::PathBuf;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::matcher::NoMatchReason;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
///
/// Aggregates errors from all subsystems for unified handling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or unreadable configuration (fatal before any job starts)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Playlist file could not be read
    #[error("Playlist error for {path}: {message}")]
    Playlist { path: PathBuf, message: String },

    /// Completion cache could not be read or written
    #[error("Cache error for {path}: {message}")]
    Cache { path: PathBuf, message: String },

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a playlist error.
    pub fn playlist(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Playlist {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a cache error.
    pub fn cache(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Cache {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Terminal failure of a single download job.
///
/// These are recorded as `Failed` in the completion cache and logged against
/// the playlist entry; they never abort the run.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// The matcher found no acceptable candidate
    #[error("No match found: {0}")]
    NoMatchFound(NoMatchReason),

    /// The catalog stayed unavailable after all retry attempts
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(CatalogError),

    /// Writing audio, tags, or lyrics to disk failed
    #[error("Write failure for {path}: {message}")]
    WriteFailure { path: PathBuf, message: String },
}

impl DownloadError {
    /// Create a write failure.
    pub fn write(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::WriteFailure {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

impl From<CatalogError> for DownloadError {
    fn from(err: CatalogError) -> Self {
        Self::CatalogUnavailable(err)
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}
