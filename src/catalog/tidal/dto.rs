//! Tidal proxy API Data Transfer Objects
//!
//! These types match EXACTLY what the search and streaming instances return.
//! DO NOT add fields that aren't in the API response.
//! DO NOT use these types outside the tidal module - convert to domain types.
//!
//! Both endpoints wrap their payload in a `data` envelope.

use serde::{Deserialize, Serialize};

/// `GET /search/?s=<query>` response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResponse {
    pub data: SearchData,
}

/// Paged search results
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchData {
    #[serde(default)]
    pub items: Vec<TrackItem>,
    pub total_number_of_items: Option<u32>,
}

/// A track in search results
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackItem {
    pub id: u64,
    pub title: String,
    /// Version suffix ("Remastered 2009", "Live")
    pub version: Option<String>,
    /// Duration in seconds
    pub duration: Option<u32>,
    pub track_number: Option<u32>,
    /// ISO 8601 timestamp when streaming started
    pub stream_start_date: Option<String>,
    pub audio_quality: Option<String>,
    /// Primary artist
    pub artist: Option<ArtistRef>,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    pub album: Option<AlbumRef>,
}

/// Artist reference
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtistRef {
    pub id: Option<u64>,
    pub name: String,
}

/// Album reference
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlbumRef {
    pub id: Option<u64>,
    pub title: String,
    /// Cover UUID ("ab12-cd34-...")
    pub cover: Option<String>,
}

/// `GET /track/?id=<id>&quality=<q>` response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackResponse {
    pub data: Option<TrackPlayback>,
}

/// Playback info for a track
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPlayback {
    pub track_id: Option<u64>,
    pub audio_quality: Option<String>,
    pub manifest_mime_type: Option<String>,
    /// Base64-encoded JSON [`Manifest`]
    pub manifest: String,
}

/// Decoded playback manifest
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub mime_type: Option<String>,
    pub codecs: Option<String>,
    #[serde(default)]
    pub urls: Vec<String>,
}
