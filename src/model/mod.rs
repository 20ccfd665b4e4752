//! Core data models for the download pipeline.
//!
//! Defines [`PlaylistEntry`], the immutable record produced by the playlist
//! reader, and the cache key derived from it.
//!
//! # Cache keys
//!
//! A key is `normalize(artist) + " - " + normalize(title)`, always taken from
//! the playlist side so the same entry maps to the same key no matter which
//! catalog track it ends up matched to.

use crate::matcher::normalize;

/// One track of the exported playlist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistEntry {
    /// Track title as exported
    pub title: String,
    /// Primary (first credited) artist
    pub artist: String,
    /// Every credited artist, primary first (may be empty)
    pub artists: Vec<String>,
    /// Album title, if the export has one
    pub album: Option<String>,
    /// Duration in seconds, if the export has one
    pub duration_seconds: Option<u32>,
    /// 1-based row index in the playlist file
    pub source_id: usize,
}

impl PlaylistEntry {
    /// Create an entry with a single credited artist.
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        let artist = artist.into();
        Self {
            title: title.into(),
            artists: vec![artist.clone()],
            artist,
            ..Default::default()
        }
    }

    /// Normalized cache key for this entry.
    pub fn cache_key(&self) -> String {
        cache_key(&self.artist, &self.title)
    }

    /// All credited artists, falling back to the primary artist.
    pub fn credited_artists(&self) -> Vec<&str> {
        if self.artists.is_empty() {
            vec![self.artist.as_str()]
        } else {
            self.artists.iter().map(String::as_str).collect()
        }
    }

    /// Short human-readable label used in log lines.
    pub fn label(&self) -> String {
        format!("#{} {} - {}", self.source_id, self.artist, self.title)
    }
}

/// Build a cache key from an artist and a title.
pub fn cache_key(artist: &str, title: &str) -> String {
    format!("{} - {}", normalize(artist), normalize(title))
}
