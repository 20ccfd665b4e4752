//! Lyrics fetching for fresh downloads and for backfilling cached ones.

use std::path::Path;

use crate::cache::{CacheRecord, CompletionCache};
use crate::catalog::{CandidateTrack, CatalogApi, CatalogError};
use crate::error::DownloadError;
use crate::metadata;

use super::retry::RetryPolicy;

/// What happened when lyrics were looked up for one track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LyricsOutcome {
    /// A sidecar was written
    pub written: bool,
    /// Whether plain lyrics exist, `None` when not looked up
    pub unsynced_available: Option<bool>,
}

/// Result of a backfill pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillSummary {
    /// Completed records without lyrics that were looked up again
    pub checked: usize,
    /// Records that now have a sidecar
    pub written: usize,
    pub failed: usize,
}

/// Look up lyrics for `track` and write the sidecar next to `audio_path`.
///
/// Synced lyrics are preferred; plain lyrics are only written when
/// `unsynced_enabled` is set.
pub async fn fetch_and_write(
    catalog: &dyn CatalogApi,
    retry: &RetryPolicy,
    track: &CandidateTrack,
    audio_path: &Path,
    unsynced_enabled: bool,
) -> Result<LyricsOutcome, DownloadError> {
    if !track.has_lyrics {
        return Ok(LyricsOutcome {
            written: false,
            unsynced_available: Some(false),
        });
    }

    let lyrics = match retry
        .run("lyrics lookup", || catalog.get_lyrics(track))
        .await
    {
        Ok(lyrics) => lyrics,
        Err(CatalogError::NotFound(_)) => None,
        Err(e) => return Err(DownloadError::CatalogUnavailable(e)),
    };
    let Some(lyrics) = lyrics else {
        return Ok(LyricsOutcome {
            written: false,
            unsynced_available: Some(false),
        });
    };

    let unsynced_available = Some(lyrics.plain.is_some());
    let (payload, synced) = match (lyrics.synced, lyrics.plain) {
        (Some(synced), _) => (synced, true),
        (None, Some(plain)) if unsynced_enabled => (plain, false),
        _ => {
            return Ok(LyricsOutcome {
                written: false,
                unsynced_available,
            });
        }
    };

    let path = metadata::write_lyrics(audio_path, &payload, synced)
        .map_err(|e| DownloadError::write(audio_path, format!("{e:#}")))?;
    tracing::debug!("Wrote lyrics to {}", path.display());

    Ok(LyricsOutcome {
        written: true,
        unsynced_available,
    })
}

/// Revisit Completed records without lyrics and try again.
pub async fn backfill(
    catalog: &dyn CatalogApi,
    cache: &CompletionCache,
    retry: &RetryPolicy,
    unsynced_enabled: bool,
) -> BackfillSummary {
    let mut summary = BackfillSummary::default();

    for record in cache.completed_records().into_iter().filter(|r| !r.lyrics) {
        let Some(audio_path) = record.path.clone().filter(|p| p.exists()) else {
            tracing::debug!("Skipping lyrics for {}: audio file missing", record.key);
            continue;
        };
        let Some(track) = track_from_record(&record) else {
            tracing::debug!("Skipping lyrics for {}: no catalog details", record.key);
            continue;
        };

        summary.checked += 1;
        match fetch_and_write(catalog, retry, &track, &audio_path, unsynced_enabled).await {
            Ok(outcome) => {
                if outcome.written {
                    summary.written += 1;
                    tracing::info!("Added lyrics for {}", record.key);
                }
                if let Err(e) =
                    cache.update_lyrics(&record.key, outcome.written, outcome.unsynced_available)
                {
                    tracing::error!("Failed to update cache for {}: {}", record.key, e);
                }
            }
            Err(e) => {
                summary.failed += 1;
                tracing::warn!("Lyrics lookup failed for {}: {}", record.key, e);
            }
        }
    }

    summary
}

/// Rebuild the catalog track a Completed record was downloaded from.
fn track_from_record(record: &CacheRecord) -> Option<CandidateTrack> {
    let title = record.catalog_title.clone()?;
    let artists = record.catalog_artists.clone().unwrap_or_default();
    let artist = artists.first().cloned()?;

    Some(CandidateTrack {
        id: record.catalog_id.unwrap_or_default(),
        title,
        artist,
        artists,
        album: record.catalog_album.clone().unwrap_or_default(),
        duration_seconds: record.duration_seconds,
        has_lyrics: true,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CompletedDetails;
    use crate::catalog::Lyrics;
    use crate::catalog::traits::mocks::MockCatalog;
    use crate::test_utils::{candidate, fast_retry};
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn synced_and_plain() -> Lyrics {
        Lyrics {
            synced: Some("[00:01.00] Yesterday".to_string()),
            plain: Some("Yesterday".to_string()),
        }
    }

    #[tokio::test]
    async fn test_synced_lyrics_preferred() {
        let dir = TempDir::new().unwrap();
        let audio = dir.path().join("Yesterday.m4a");
        let mock = MockCatalog::empty().with_lyrics(synced_and_plain());
        let track = candidate(1, "Yesterday", "The Beatles", Some(125));

        let outcome = fetch_and_write(&mock, &fast_retry(), &track, &audio, false)
            .await
            .unwrap();
        assert!(outcome.written);
        assert_eq!(outcome.unsynced_available, Some(true));
        assert!(dir.path().join("Yesterday.lrc").exists());
        assert!(!dir.path().join("Yesterday.txt").exists());
    }

    #[tokio::test]
    async fn test_plain_lyrics_only_when_enabled() {
        let dir = TempDir::new().unwrap();
        let audio = dir.path().join("Song.flac");
        let mock = MockCatalog::empty().with_lyrics(Lyrics {
            synced: None,
            plain: Some("words".to_string()),
        });
        let track = candidate(1, "Song", "Artist", None);

        let outcome = fetch_and_write(&mock, &fast_retry(), &track, &audio, false)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            LyricsOutcome {
                written: false,
                unsynced_available: Some(true)
            }
        );
        assert!(!dir.path().join("Song.txt").exists());

        let outcome = fetch_and_write(&mock, &fast_retry(), &track, &audio, true)
            .await
            .unwrap();
        assert!(outcome.written);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("Song.txt")).unwrap(),
            "words"
        );
    }

    #[tokio::test]
    async fn test_no_lyrics_flag_skips_lookup() {
        let dir = TempDir::new().unwrap();
        let mock = MockCatalog::empty().with_lyrics(synced_and_plain());
        let mut track = candidate(1, "Song", "Artist", None);
        track.has_lyrics = false;

        let outcome = fetch_and_write(&mock, &fast_retry(), &track, &dir.path().join("a.m4a"), true)
            .await
            .unwrap();
        assert!(!outcome.written);
        assert_eq!(mock.lyrics_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_backfill_adds_missing_lyrics() {
        let dir = TempDir::new().unwrap();
        let cache = CompletionCache::load(&dir.path().join("cache")).unwrap();

        let audio = dir.path().join("Yesterday.m4a");
        std::fs::write(&audio, b"audio").unwrap();
        cache
            .record_completed(
                "the beatles - yesterday",
                CompletedDetails {
                    path: audio.clone(),
                    lyrics: false,
                    catalog_id: Some(1),
                    catalog_title: Some("Yesterday".to_string()),
                    catalog_artists: vec!["The Beatles".to_string()],
                    ..Default::default()
                },
            )
            .unwrap();
        // Audio file gone: skipped
        cache
            .record_completed(
                "x - y",
                CompletedDetails {
                    path: dir.path().join("missing.m4a"),
                    catalog_title: Some("Y".to_string()),
                    catalog_artists: vec!["X".to_string()],
                    ..Default::default()
                },
            )
            .unwrap();

        let mock = MockCatalog::empty().with_lyrics(synced_and_plain());
        let summary = backfill(&mock, &cache, &fast_retry(), false).await;

        assert_eq!(
            summary,
            BackfillSummary {
                checked: 1,
                written: 1,
                failed: 0
            }
        );
        assert!(dir.path().join("Yesterday.lrc").exists());
        assert!(cache.completed_record("the beatles - yesterday").unwrap().lyrics);
        assert_eq!(mock.lyrics_calls.load(Ordering::SeqCst), 1);

        // Nothing left to do
        let summary = backfill(&mock, &cache, &fast_retry(), false).await;
        assert_eq!(summary.checked, 0);
    }

    #[test]
    fn test_track_from_record_needs_catalog_details() {
        let dir = TempDir::new().unwrap();
        let cache = CompletionCache::load(dir.path()).unwrap();
        cache
            .record_completed("k", CompletedDetails::default())
            .unwrap();
        let record = cache.completed_record("k").unwrap();
        assert!(track_from_record(&record).is_none());
    }
}
