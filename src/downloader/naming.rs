//! Output paths for downloaded tracks.
//!
//! Layout: `<download_path>/<artist>/<album>/<title>.<ext>`, with every
//! component sanitized so it can never escape the download directory.

use std::path::{Path, PathBuf};

use crate::catalog::{CandidateTrack, Quality};
use crate::model::PlaylistEntry;

/// Characters Windows refuses in file names (besides `/` and NUL, which are always removed)
const WINDOWS_RESERVED: [char; 7] = ['<', '>', ':', '"', '\\', '|', '?'];

const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Artist, album and title used to name the files of one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackNames {
    pub artist: String,
    pub album: String,
    pub title: String,
}

impl TrackNames {
    /// Pick names from the catalog track or from the playlist entry.
    ///
    /// The album falls back to the catalog album when the entry has none.
    pub fn choose(entry: &PlaylistEntry, track: &CandidateTrack, prefer_catalog: bool) -> Self {
        let (artist, album, title) = if prefer_catalog {
            (
                track.artist.clone(),
                Some(track.album.clone()),
                track.title.clone(),
            )
        } else {
            (
                entry.artist.clone(),
                entry
                    .album
                    .clone()
                    .or_else(|| Some(track.album.clone())),
                entry.title.clone(),
            )
        };

        Self {
            artist,
            album: album
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
            title,
        }
    }
}

/// Sanitize one path component.
///
/// `/` and NUL are always removed. With `windows_safe`, `<>:"\|?*` are removed
/// too and leading/trailing spaces and dots are trimmed. A component that
/// would end up empty or be `.`/`..` becomes `_`.
pub fn sanitize_component(name: &str, windows_safe: bool) -> String {
    let cleaned: String = name
        .chars()
        .filter(|&c| c != '/' && c != '\0')
        .filter(|&c| !windows_safe || (c != '*' && !WINDOWS_RESERVED.contains(&c)))
        .collect();

    let cleaned = if windows_safe {
        cleaned.trim_matches(|c: char| c == ' ' || c == '.').to_string()
    } else {
        cleaned
    };

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "_".to_string()
    } else {
        cleaned
    }
}

/// Final audio path for a track.
pub fn audio_path(
    root: &Path,
    names: &TrackNames,
    quality: Quality,
    windows_safe: bool,
) -> PathBuf {
    let file_name = format!(
        "{}.{}",
        sanitize_component(&names.title, windows_safe),
        quality.extension()
    );
    root.join(sanitize_component(&names.artist, windows_safe))
        .join(sanitize_component(&names.album, windows_safe))
        .join(file_name)
}

/// Temporary path the audio is streamed into before the final rename.
///
/// Two playlist rows can resolve to the same final path, so the row id keeps
/// their part files apart.
pub fn part_path(audio_path: &Path, source_id: usize) -> PathBuf {
    let mut name = audio_path.as_os_str().to_os_string();
    name.push(format!(".{source_id}.part"));
    PathBuf::from(name)
}
