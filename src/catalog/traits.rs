//! Trait definition for the catalog backend.
//!
//! The trait enables dependency injection and mocking for tests.
//! Production code uses [`TidalClient`](super::TidalClient), while tests
//! substitute [`mocks::MockCatalog`].
//!
//! # Example
//!
//! ```ignore
//! use spotidal::catalog::CatalogApi;
//!
//! async fn first_hit<C: CatalogApi>(client: &C) -> Option<CandidateTrack> {
//!     client.search("Yesterday", "The Beatles").await.ok()?.into_iter().next()
//! }
//! ```

use async_trait::async_trait;

use super::domain::{AudioStream, CandidateTrack, CatalogError, Lyrics, Quality};

/// Search, stream, and lyrics access to a streaming catalog.
///
/// Implementations must be stateless per call so a single instance can be
/// shared by all download workers.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Search the catalog. An empty `artist` searches by title only.
    async fn search(&self, title: &str, artist: &str)
    -> Result<Vec<CandidateTrack>, CatalogError>;

    /// Open the audio stream of a track at the given quality.
    async fn get_audio_stream(
        &self,
        track_id: u64,
        quality: Quality,
    ) -> Result<AudioStream, CatalogError>;

    /// Fetch lyrics for a track. `Ok(None)` when none exist.
    async fn get_lyrics(&self, track: &CandidateTrack) -> Result<Option<Lyrics>, CatalogError>;

    /// Fetch album cover image bytes.
    async fn get_cover_art(&self, cover_id: &str) -> Result<Vec<u8>, CatalogError>;
}

/// Mock catalog for testing.
///
/// Returns configurable responses and counts every call so tests can assert
/// on network activity and concurrency.
#[cfg(test)]
pub mod mocks {
    use super::*;
    use bytes::Bytes;
    use futures::StreamExt;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Mock catalog that serves candidates by lowercase title.
    #[derive(Default)]
    pub struct MockCatalog {
        /// Candidates keyed by lowercase search title
        pub tracks: HashMap<String, Vec<CandidateTrack>>,
        /// Audio payload returned for every stream (a taggable WAV by default)
        pub audio: Vec<u8>,
        /// Lyrics returned for every track
        pub lyrics: Option<Lyrics>,
        /// Cover bytes (None = cover lookup fails with NotFound)
        pub cover: Option<Vec<u8>>,
        /// Error returned from every search (takes precedence)
        pub search_error: Option<CatalogError>,
        /// Number of searches that fail with a parse error first
        pub failing_searches: AtomicUsize,
        /// Track IDs whose stream request fails permanently
        pub broken_streams: HashSet<u64>,
        /// Number of stream requests that fail with a transient error first
        pub transient_stream_failures: AtomicUsize,
        /// Number of streams that break with a network error after the first chunk
        pub broken_midstream: AtomicUsize,
        /// Delay before a stream is handed out
        pub stream_delay: Duration,

        pub search_calls: AtomicUsize,
        pub stream_calls: AtomicUsize,
        pub lyrics_calls: AtomicUsize,
        pub cover_calls: AtomicUsize,

        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
        searched: Mutex<Vec<(String, String)>>,
    }

    impl MockCatalog {
        /// Create a mock that knows nothing and returns empty searches.
        pub fn empty() -> Self {
            Self {
                audio: crate::test_utils::silent_wav(),
                ..Default::default()
            }
        }

        /// Register candidates for a title.
        pub fn with_track(mut self, title: &str, candidates: Vec<CandidateTrack>) -> Self {
            self.tracks.insert(title.to_lowercase(), candidates);
            self
        }

        pub fn with_lyrics(mut self, lyrics: Lyrics) -> Self {
            self.lyrics = Some(lyrics);
            self
        }

        /// Total number of calls of any kind.
        pub fn total_calls(&self) -> usize {
            self.search_calls.load(Ordering::SeqCst)
                + self.stream_calls.load(Ordering::SeqCst)
                + self.lyrics_calls.load(Ordering::SeqCst)
                + self.cover_calls.load(Ordering::SeqCst)
        }

        /// Highest number of streams open at the same time.
        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }

        /// (title, artist) pairs searched so far, in call order.
        pub fn searched(&self) -> Vec<(String, String)> {
            self.searched.lock().clone()
        }
    }

    /// Decrement a failure budget, returning whether one was left.
    fn take_one(budget: &AtomicUsize) -> bool {
        budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Decrements the in-flight counter when the stream is dropped.
    struct InFlightGuard(Arc<AtomicUsize>);

    impl Drop for InFlightGuard {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl CatalogApi for MockCatalog {
        async fn search(
            &self,
            title: &str,
            artist: &str,
        ) -> Result<Vec<CandidateTrack>, CatalogError> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            self.searched
                .lock()
                .push((title.to_string(), artist.to_string()));
            if let Some(ref err) = self.search_error {
                return Err(err.clone());
            }
            if take_one(&self.failing_searches) {
                return Err(CatalogError::Parse("unexpected response".to_string()));
            }
            Ok(self
                .tracks
                .get(&title.to_lowercase())
                .cloned()
                .unwrap_or_default())
        }

        async fn get_audio_stream(
            &self,
            track_id: u64,
            _quality: Quality,
        ) -> Result<AudioStream, CatalogError> {
            self.stream_calls.fetch_add(1, Ordering::SeqCst);
            if self.broken_streams.contains(&track_id) {
                return Err(CatalogError::NotFound(format!("track {track_id}")));
            }
            if take_one(&self.transient_stream_failures) {
                return Err(CatalogError::Network("connection reset".to_string()));
            }

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let guard = InFlightGuard(Arc::clone(&self.in_flight));

            if !self.stream_delay.is_zero() {
                tokio::time::sleep(self.stream_delay).await;
            }

            // Two chunks so writers see a real stream
            let (head, tail) = self.audio.split_at(self.audio.len() / 2);
            let tail = if take_one(&self.broken_midstream) {
                Err(CatalogError::Network("connection reset".to_string()))
            } else {
                Ok(Bytes::copy_from_slice(tail))
            };
            let chunks = vec![Ok(Bytes::copy_from_slice(head)), tail];
            Ok(futures::stream::iter(chunks)
                .map(move |chunk| {
                    let _held = &guard;
                    chunk
                })
                .boxed())
        }

        async fn get_lyrics(
            &self,
            _track: &CandidateTrack,
        ) -> Result<Option<Lyrics>, CatalogError> {
            self.lyrics_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.lyrics.clone())
        }

        async fn get_cover_art(&self, cover_id: &str) -> Result<Vec<u8>, CatalogError> {
            self.cover_calls.fetch_add(1, Ordering::SeqCst);
            self.cover
                .clone()
                .ok_or_else(|| CatalogError::NotFound(format!("cover {cover_id}")))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use futures::TryStreamExt;

        #[tokio::test]
        async fn test_mock_search_unknown_title() {
            let mock = MockCatalog::empty();
            let results = mock.search("Nothing", "Nobody").await.unwrap();
            assert!(results.is_empty());
            assert_eq!(mock.search_calls.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn test_mock_search_error() {
            let mock = MockCatalog {
                search_error: Some(CatalogError::RateLimited),
                ..MockCatalog::empty()
            };
            let result = mock.search("Song", "Artist").await;
            assert!(matches!(result, Err(CatalogError::RateLimited)));
        }

        #[tokio::test]
        async fn test_mock_stream_yields_audio() {
            let mock = MockCatalog::empty();
            let stream = mock.get_audio_stream(1, Quality::High).await.unwrap();
            let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
            let audio: Vec<u8> = chunks.concat();
            assert_eq!(audio, crate::test_utils::silent_wav());
            assert_eq!(mock.in_flight.load(Ordering::SeqCst), 0);
            assert_eq!(mock.max_in_flight(), 1);
        }

        #[tokio::test]
        async fn test_mock_transient_failures_run_out() {
            let mock = MockCatalog {
                transient_stream_failures: AtomicUsize::new(1),
                ..MockCatalog::empty()
            };
            assert!(mock.get_audio_stream(1, Quality::High).await.is_err());
            assert!(mock.get_audio_stream(1, Quality::High).await.is_ok());
        }
    }
}
