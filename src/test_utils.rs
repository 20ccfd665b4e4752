//! Test utilities and fixtures for spotidal tests.
//!
//! This module provides common test helpers and factories to reduce
//! boilerplate in tests.
//!
//! # Example
//!
//! ```ignore
//! use spotidal::test_utils::{candidate, test_options};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let dir = tempfile::tempdir().unwrap();
//!     let options = test_options(dir.path());
//!     let track = candidate(1, "Yesterday", "The Beatles", Some(125));
//!     // ... test logic
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use crate::catalog::{CandidateTrack, Quality};
use crate::downloader::{DownloadOptions, RetryPolicy};
use crate::matcher::MatchConfig;

/// Creates a catalog candidate with sensible defaults.
///
/// Customize with plain field assignment:
///
/// ```ignore
/// let mut track = candidate(1, "Hello", "Adele", None);
/// track.album = "25".to_string();
/// ```
pub fn candidate(id: u64, title: &str, artist: &str, duration: Option<u32>) -> CandidateTrack {
    CandidateTrack {
        id,
        title: title.to_string(),
        artist: artist.to_string(),
        artists: vec![artist.to_string()],
        album: "Test Album".to_string(),
        duration_seconds: duration,
        has_lyrics: true,
        track_number: Some(1),
        cover_id: None,
        release_date: Some("2020-01-01".to_string()),
    }
}

/// Download options writing under `download_path`, with three workers.
pub fn test_options(download_path: &Path) -> DownloadOptions {
    DownloadOptions {
        download_path: download_path.to_path_buf(),
        quality: Quality::High,
        lyrics: true,
        unsynced_lyrics: false,
        prefer_catalog_naming: false,
        windows_safe_file_names: true,
        concurrent_downloads: 3,
        retry_failed: true,
        sync: false,
        log_skipped: true,
        matching: MatchConfig::default(),
    }
}

/// Retry policy with millisecond backoff so tests stay fast.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(1),
    }
}

/// A valid mono 16-bit PCM WAV with a tenth of a second of silence.
///
/// Small enough to stream through the mock catalog and real enough for
/// lofty to tag.
pub fn silent_wav() -> Vec<u8> {
    let samples: u32 = 800;
    let data_len = samples * 2;
    let mut wav = Vec::with_capacity(44 + data_len as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVEfmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&8000u32.to_le_bytes());
    wav.extend_from_slice(&16000u32.to_le_bytes()); // byte rate
    wav.extend_from_slice(&2u16.to_le_bytes()); // block align
    wav.extend_from_slice(&16u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.resize(wav.len() + data_len as usize, 0);
    wav
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_defaults() {
        let track = candidate(3, "Hello", "Adele", Some(295));
        assert_eq!(track.artists, vec!["Adele"]);
        assert!(track.has_lyrics);
    }

    #[test]
    fn test_silent_wav_header() {
        let wav = silent_wav();
        assert_eq!(&wav[..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(wav.len(), 44 + 1600);
    }
}
