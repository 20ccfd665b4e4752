//! Download orchestrator.
//!
//! Turns playlist entries into tagged audio files on disk:
//!
//! 1. Skip entries the completion cache already handled
//! 2. Search the catalog (with query fallbacks) and pick a match
//! 3. Stream the audio into `<final>.part`, tag it, rename into place
//! 4. Optionally write a lyrics sidecar
//! 5. Record the outcome in the cache
//!
//! At most `concurrent_downloads` jobs run at once. A failing job is recorded
//! and logged; it never stops its siblings. Setting the [`StopSignal`] keeps
//! new jobs from starting while in-flight jobs finish.

pub mod lyrics;
pub mod naming;
pub mod retry;
pub mod sync;

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::{StreamExt, TryStreamExt};
use tokio::io::AsyncWriteExt;

use crate::cache::{CompletedDetails, CompletionCache};
use crate::catalog::{CandidateTrack, CatalogApi, Quality};
use crate::config::Config;
use crate::error::DownloadError;
use crate::matcher::{self, MatchConfig, MatchResult, NoMatchReason};
use crate::metadata::{self, TrackTags};
use crate::model::PlaylistEntry;

pub use lyrics::{BackfillSummary, LyricsOutcome};
pub use naming::TrackNames;
pub use retry::RetryPolicy;
pub use sync::SyncReport;

/// Cooperative stop flag shared between the orchestrator and a signal handler.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the orchestrator to start no new jobs.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counts of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Downloaded during this run
    pub completed: usize,
    pub failed: usize,
    /// Already handled (or duplicated within the playlist)
    pub skipped: usize,
    /// Never started because of a stop request
    pub cancelled: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} completed, {} failed, {} skipped, {} cancelled",
            self.completed, self.failed, self.skipped, self.cancelled
        )
    }
}

/// Settings the orchestrator needs, gathered from [`Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadOptions {
    pub download_path: PathBuf,
    pub quality: Quality,
    pub lyrics: bool,
    pub unsynced_lyrics: bool,
    pub prefer_catalog_naming: bool,
    pub windows_safe_file_names: bool,
    pub concurrent_downloads: usize,
    pub retry_failed: bool,
    pub sync: bool,
    pub log_skipped: bool,
    pub matching: MatchConfig,
}

impl DownloadOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            download_path: config.paths.download_path.clone(),
            quality: config.songs.quality,
            lyrics: config.songs.lyrics,
            unsynced_lyrics: config.songs.unsynced_lyrics,
            prefer_catalog_naming: config.downloader.prefer_tidal_naming,
            windows_safe_file_names: config.downloader.windows_safe_file_names,
            concurrent_downloads: config.downloader.concurrent_downloads,
            retry_failed: config.downloader.retry_failed,
            sync: config.downloader.sync,
            log_skipped: config.logging.log_skipped,
            matching: config.matching.clone(),
        }
    }
}

/// One entry that needs work.
struct DownloadJob<'a> {
    entry: &'a PlaylistEntry,
    key: String,
}

enum JobOutcome {
    Completed,
    Failed,
    Cancelled,
}

/// Bounded-concurrency download pipeline.
pub struct Downloader {
    catalog: Arc<dyn CatalogApi>,
    cache: Arc<CompletionCache>,
    options: DownloadOptions,
    retry: RetryPolicy,
    stop: StopSignal,
}

impl Downloader {
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        cache: Arc<CompletionCache>,
        options: DownloadOptions,
    ) -> Self {
        Self {
            catalog,
            cache,
            options,
            retry: RetryPolicy::default(),
            stop: StopSignal::new(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Handle to stop this downloader from another task.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Process every entry and return the run's counts.
    pub async fn run(&self, entries: &[PlaylistEntry]) -> Summary {
        let mut summary = Summary::default();
        let mut seen = HashSet::new();
        let mut jobs = Vec::new();

        for entry in entries {
            let key = entry.cache_key();
            if !seen.insert(key.clone()) {
                tracing::debug!("[{}] Duplicate of an earlier entry: {}", entry.source_id, key);
                summary.skipped += 1;
                continue;
            }
            if self.cache.is_completed(&key) {
                self.log_skip(entry, "already downloaded");
                summary.skipped += 1;
                continue;
            }
            if self.cache.is_permanently_failed(&key) && !self.options.retry_failed {
                self.log_skip(entry, "failed previously");
                summary.skipped += 1;
                continue;
            }
            jobs.push(DownloadJob { entry, key });
        }

        tracing::info!(
            "{} tracks to download, {} skipped",
            jobs.len(),
            summary.skipped
        );

        let outcomes: Vec<JobOutcome> = futures::stream::iter(jobs)
            .map(|job| self.process(job))
            .buffer_unordered(self.options.concurrent_downloads.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                JobOutcome::Completed => summary.completed += 1,
                JobOutcome::Failed => summary.failed += 1,
                JobOutcome::Cancelled => summary.cancelled += 1,
            }
        }

        if self.options.sync {
            if self.stop.is_stopped() {
                tracing::info!("Stop requested, skipping playlist sync");
            } else {
                match sync::cleanup(&self.cache, &seen, &self.options.download_path) {
                    Ok(report) if !report.removed_keys.is_empty() => tracing::info!(
                        "Sync removed {} tracks ({} files)",
                        report.removed_keys.len(),
                        report.removed_files.len()
                    ),
                    Ok(_) => {}
                    Err(e) => tracing::error!("Playlist sync failed: {}", e),
                }
            }
        }

        tracing::info!("Finished: {}", summary);
        summary
    }

    /// Look up lyrics again for completed downloads that have none.
    pub async fn backfill_lyrics(&self) -> BackfillSummary {
        if !self.options.lyrics {
            tracing::info!("Lyrics are disabled, nothing to backfill");
            return BackfillSummary::default();
        }
        lyrics::backfill(
            self.catalog.as_ref(),
            &self.cache,
            &self.retry,
            self.options.unsynced_lyrics,
        )
        .await
    }

    /// Search with query fallbacks and return the best match.
    ///
    /// A query whose search fails does not end the fallback; the error is only
    /// reported when no query got an answer from the catalog at all.
    pub async fn find_match(
        &self,
        entry: &PlaylistEntry,
    ) -> Result<(CandidateTrack, f64), DownloadError> {
        let mut reason = NoMatchReason::NoCandidates;
        let mut answered = false;
        let mut last_error = None;

        for query in matcher::search_queries(entry) {
            let candidates = match self
                .retry
                .run("search", || self.catalog.search(&query.title, &query.artist))
                .await
            {
                Ok(candidates) => candidates,
                Err(e) => {
                    tracing::debug!("[{}] Search '{}' failed: {}", entry.source_id, query, e);
                    last_error = Some(e);
                    continue;
                }
            };
            answered = true;
            tracing::debug!(
                "[{}] '{}' returned {} candidates",
                entry.source_id,
                query,
                candidates.len()
            );

            match matcher::match_entry(entry, &candidates, &self.options.matching) {
                MatchResult::Matched { track, score } => return Ok((track, score)),
                MatchResult::NoMatch(no_match) => reason = reason.most_informative(no_match),
            }
        }

        match last_error {
            Some(e) if !answered => Err(DownloadError::CatalogUnavailable(e)),
            _ => Err(DownloadError::NoMatchFound(reason)),
        }
    }

    async fn process(&self, job: DownloadJob<'_>) -> JobOutcome {
        if self.stop.is_stopped() {
            return JobOutcome::Cancelled;
        }

        let entry = job.entry;
        let error = match self.download(entry).await {
            Ok(details) => {
                let path = details.path.clone();
                match self.cache.record_completed(&job.key, details) {
                    Ok(()) => {
                        tracing::info!("Downloaded {} -> {}", entry.label(), path.display());
                        return JobOutcome::Completed;
                    }
                    Err(e) => {
                        tracing::error!("Failed to record {} in cache: {}", job.key, e);
                        format!("downloaded to {} but not recorded: {}", path.display(), e)
                    }
                }
            }
            Err(e) => {
                tracing::warn!("{}: {}", entry.label(), e);
                e.to_string()
            }
        };

        if let Err(cache_err) = self.cache.record_failed(&job.key, error) {
            tracing::error!("Failed to record {} in cache: {}", job.key, cache_err);
        }
        JobOutcome::Failed
    }

    async fn download(&self, entry: &PlaylistEntry) -> Result<CompletedDetails, DownloadError> {
        let (track, score) = self.find_match(entry).await?;
        tracing::debug!(
            "[{}] Matched '{}' by {} (id {}, score {:.3})",
            entry.source_id,
            track.title,
            track.artist,
            track.id,
            score
        );

        let names = TrackNames::choose(entry, &track, self.options.prefer_catalog_naming);
        let audio_path = naming::audio_path(
            &self.options.download_path,
            &names,
            self.options.quality,
            self.options.windows_safe_file_names,
        );
        let part_path = naming::part_path(&audio_path, entry.source_id);

        if let Err(e) = self.write_audio(&track, &names, &part_path, &audio_path).await {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(e);
        }

        // The audio stays in place on failure; a retry overwrites it
        let lyrics = if self.options.lyrics {
            lyrics::fetch_and_write(
                self.catalog.as_ref(),
                &self.retry,
                &track,
                &audio_path,
                self.options.unsynced_lyrics,
            )
            .await?
        } else {
            LyricsOutcome::default()
        };

        Ok(CompletedDetails {
            path: audio_path,
            lyrics: lyrics.written,
            unsynced_available: lyrics.unsynced_available,
            catalog_id: Some(track.id),
            catalog_title: Some(track.title),
            catalog_artists: if track.artists.is_empty() {
                vec![track.artist]
            } else {
                track.artists
            },
            catalog_album: Some(track.album).filter(|a| !a.is_empty()),
            duration_seconds: track.duration_seconds,
        })
    }

    /// Stream, tag and move the audio into place.
    async fn write_audio(
        &self,
        track: &CandidateTrack,
        names: &TrackNames,
        part_path: &Path,
        audio_path: &Path,
    ) -> Result<(), DownloadError> {
        if let Some(dir) = audio_path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| DownloadError::write(dir, e))?;
        }

        let bytes = self
            .retry
            .run("audio download", || self.stream_to_file(track.id, part_path))
            .await?;
        tracing::debug!("Wrote {} bytes to {}", bytes, part_path.display());

        let cover_art = match &track.cover_id {
            Some(cover_id) => match self
                .retry
                .run("cover art", || self.catalog.get_cover_art(cover_id))
                .await
            {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    tracing::debug!("No cover art for track {}: {}", track.id, e);
                    None
                }
            },
            None => None,
        };

        let tags = TrackTags {
            title: names.title.clone(),
            artist: names.artist.clone(),
            album: names.album.clone(),
            track_number: track.track_number,
            release_date: track.release_date.clone(),
            cover_art,
        };
        let tag_path = part_path.to_path_buf();
        tokio::task::spawn_blocking(move || metadata::embed(&tag_path, &tags))
            .await
            .map_err(|e| DownloadError::write(part_path, e))?
            .map_err(|e| DownloadError::write(part_path, format!("{e:#}")))?;

        tokio::fs::rename(part_path, audio_path)
            .await
            .map_err(|e| DownloadError::write(audio_path, e))
    }

    /// One download attempt: open the stream and write it all to `part_path`.
    ///
    /// Each attempt truncates the part file, so a stream that breaks halfway
    /// can simply be tried again.
    async fn stream_to_file(&self, track_id: u64, part_path: &Path) -> Result<u64, DownloadError> {
        let mut stream = self
            .catalog
            .get_audio_stream(track_id, self.options.quality)
            .await?;

        let mut file = tokio::fs::File::create(part_path)
            .await
            .map_err(|e| DownloadError::write(part_path, e))?;
        let mut written = 0u64;
        while let Some(chunk) = stream.try_next().await? {
            file.write_all(&chunk)
                .await
                .map_err(|e| DownloadError::write(part_path, e))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| DownloadError::write(part_path, e))?;

        if written == 0 {
            return Err(DownloadError::write(
                part_path,
                format!("empty audio stream for track {track_id}"),
            ));
        }
        Ok(written)
    }

    fn log_skip(&self, entry: &PlaylistEntry, why: &str) {
        if self.options.log_skipped {
            tracing::info!("Skipping {}: {}", entry.label(), why);
        } else {
            tracing::debug!("Skipping {}: {}", entry.label(), why);
        }
    }
}
