//! Adapter layer: Convert Tidal DTOs to domain models
//!
//! This is the ONLY place where Tidal DTO types are converted to domain types.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use super::dto;
use crate::catalog::domain::{CandidateTrack, CatalogError};

/// Convert a search response into candidates, preserving catalog order.
pub fn to_candidates(response: dto::SearchResponse) -> Vec<CandidateTrack> {
    response.data.items.into_iter().map(to_candidate).collect()
}

fn to_candidate(item: dto::TrackItem) -> CandidateTrack {
    let artists: Vec<String> = item.artists.into_iter().map(|a| a.name).collect();
    let artist = item
        .artist
        .map(|a| a.name)
        .or_else(|| artists.first().cloned())
        .unwrap_or_default();

    // "Title (Version)" is how the catalog displays versioned tracks
    let title = match item.version.as_deref().map(str::trim) {
        Some(version) if !version.is_empty() => format!("{} ({})", item.title, version),
        _ => item.title,
    };

    let (album, cover_id) = match item.album {
        Some(album) => (album.title, album.cover.filter(|c| !c.is_empty())),
        None => (String::new(), None),
    };

    CandidateTrack {
        id: item.id,
        title,
        artist,
        artists,
        album,
        duration_seconds: item.duration.filter(|d| *d > 0),
        // Search items carry no lyrics flag
        has_lyrics: true,
        track_number: item.track_number,
        cover_id,
        release_date: item.stream_start_date,
    }
}

/// Decode the base64 playback manifest and return the first stream URL.
pub fn to_stream_url(response: dto::TrackResponse) -> Result<String, CatalogError> {
    let playback = response
        .data
        .ok_or_else(|| CatalogError::InvalidResponse("track response has no data".to_string()))?;

    let raw = BASE64
        .decode(playback.manifest.trim())
        .map_err(|e| CatalogError::Parse(format!("manifest is not base64: {e}")))?;
    let manifest: dto::Manifest =
        serde_json::from_slice(&raw).map_err(|e| CatalogError::Parse(e.to_string()))?;

    manifest
        .urls
        .into_iter()
        .next()
        .ok_or_else(|| CatalogError::InvalidResponse("manifest lists no URLs".to_string()))
}

/// Image URL for a cover UUID: dashes become path separators.
pub fn cover_url(base_url: &str, cover_id: &str) -> String {
    format!("{}/{}/1280x1280.jpg", base_url, cover_id.replace('-', "/"))
}
