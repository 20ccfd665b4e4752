//! Audio tag embedding and lyric sidecars.
//!
//! Uses the lofty crate for format-independent tag access. The file format is
//! detected from content rather than the extension, so tags can be written to
//! a `.part` download before it is renamed into place.
//!
//! Lyrics are written next to the audio file:
//! - `<stem>.lrc` for time-synced lyrics
//! - `<stem>.txt` for plain lyrics

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag, TagExt};

/// Tags written into a downloaded file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackTags {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub track_number: Option<u32>,
    /// `YYYY`, `YYYY-MM` or `YYYY-MM-DD`
    pub release_date: Option<String>,
    /// JPEG or PNG bytes
    pub cover_art: Option<Vec<u8>>,
}

/// Write tags (and cover art) into an audio file in place.
pub fn embed(path: &Path, tags: &TrackTags) -> Result<()> {
    let mut tagged_file = Probe::open(path)
        .context("Failed to open file for probing")?
        .guess_file_type()
        .context("Failed to detect audio format")?
        .read()
        .context("Failed to read file for tag writing")?;

    let tag_type = tagged_file.primary_tag_type();
    if tagged_file.tag(tag_type).is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged_file
        .tag_mut(tag_type)
        .context("Audio format does not support tags")?;

    tag.set_title(tags.title.clone());
    tag.set_artist(tags.artist.clone());
    tag.set_album(tags.album.clone());

    if let Some(track) = tags.track_number {
        tag.set_track(track);
    }

    if let Some(ref date) = tags.release_date {
        if let Some(year) = release_year(date) {
            tag.set_year(year);
        }
        tag.insert_text(ItemKey::RecordingDate, date.clone());
    }

    if let Some(ref cover) = tags.cover_art {
        match sniff_image(cover) {
            Some(mime) => {
                tag.remove_picture_type(PictureType::CoverFront);
                tag.push_picture(Picture::new_unchecked(
                    PictureType::CoverFront,
                    Some(mime),
                    None,
                    cover.clone(),
                ));
            }
            None => tracing::debug!("Skipping cover art for {:?}: not JPEG or PNG", path),
        }
    }

    tag.save_to_path(path, WriteOptions::default())
        .context("Failed to write tags to file")?;
    Ok(())
}

/// Write a lyrics sidecar next to `audio_path` and return its path.
pub fn write_lyrics(audio_path: &Path, payload: &str, synced: bool) -> Result<PathBuf> {
    let [lrc, txt] = lyrics_sidecars(audio_path);
    let target = if synced { lrc } else { txt };

    let mut temp_name = target.as_os_str().to_os_string();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    std::fs::write(&temp_path, payload)
        .with_context(|| format!("Failed to write lyrics to {}", temp_path.display()))?;
    std::fs::rename(&temp_path, &target)
        .with_context(|| format!("Failed to move lyrics into {}", target.display()))?;
    Ok(target)
}

/// Both possible sidecar paths: `[synced .lrc, plain .txt]`.
pub fn lyrics_sidecars(audio_path: &Path) -> [PathBuf; 2] {
    [
        audio_path.with_extension("lrc"),
        audio_path.with_extension("txt"),
    ]
}

fn release_year(date: &str) -> Option<u32> {
    date.get(..4)?.parse().ok()
}

fn sniff_image(data: &[u8]) -> Option<MimeType> {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(MimeType::Jpeg)
    } else if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(MimeType::Png)
    } else {
        None
    }
}
