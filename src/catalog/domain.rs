//! Internal domain models for catalog lookups.
//!
//! These types are OUR types - they don't change when external APIs change.
//! All external API responses get converted into these types via adapters.

use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// A track returned by a catalog search.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CandidateTrack {
    /// Catalog track ID
    pub id: u64,
    /// Track title, including any version suffix ("Song (Live)")
    pub title: String,
    /// Primary artist name
    pub artist: String,
    /// All credited artists (primary first)
    pub artists: Vec<String>,
    /// Album title
    pub album: String,
    /// Duration in seconds (if known)
    pub duration_seconds: Option<u32>,
    /// Whether lyrics may exist; backends without the information report true
    pub has_lyrics: bool,
    /// Track number on album
    pub track_number: Option<u32>,
    /// Album cover ID
    pub cover_id: Option<String>,
    /// Release date (YYYY-MM-DD or full timestamp)
    pub release_date: Option<String>,
}

impl CandidateTrack {
    /// Artist credit for display: "A, B" for collaborations, otherwise the primary artist.
    pub fn artist_credit(&self) -> String {
        if self.artists.len() > 1 {
            self.artists.join(", ")
        } else {
            self.artist.clone()
        }
    }
}

/// Audio quality requested from the streaming backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    #[default]
    High,
    Lossless,
}

impl Quality {
    /// Name used by the streaming API.
    pub fn api_name(&self) -> &'static str {
        match self {
            Quality::Low => "LOW",
            Quality::High => "HIGH",
            Quality::Lossless => "LOSSLESS",
        }
    }

    /// File extension of the delivered container.
    pub fn extension(&self) -> &'static str {
        match self {
            Quality::Lossless => "flac",
            Quality::Low | Quality::High => "m4a",
        }
    }
}

/// Lyrics for a track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lyrics {
    /// Timestamped LRC text
    pub synced: Option<String>,
    /// Plain text
    pub plain: Option<String>,
}

/// Streamed audio body.
pub type AudioStream = BoxStream<'static, Result<Bytes, CatalogError>>;

/// Errors that can occur while talking to the catalog
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Rate limited - try again later")]
    RateLimited,

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

impl CatalogError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::Network(_) | CatalogError::Timeout(_) | CatalogError::RateLimited => true,
            CatalogError::Http { status, .. } => *status >= 500,
            CatalogError::NotFound(_)
            | CatalogError::Parse(_)
            | CatalogError::InvalidResponse(_) => false,
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CatalogError::Timeout(err.to_string())
        } else if err.is_decode() {
            CatalogError::Parse(err.to_string())
        } else {
            CatalogError::Network(err.to_string())
        }
    }
}
