//! Tidal proxy HTTP client
//!
//! Talks to two kinds of community-run instances:
//! - a search API instance (`/search/?s=`) returning catalog track items
//! - a streaming instance (`/track/?id=&quality=`) returning a base64
//!   playback manifest that points at the audio file
//!
//! Lyrics come from LRCLIB and covers from the Tidal image CDN. All requests
//! share one connection pool, so a single client serves every worker.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};

use super::{adapter, dto};
use crate::catalog::CatalogApi;
use crate::catalog::domain::{AudioStream, CandidateTrack, CatalogError, Lyrics, Quality};
use crate::catalog::lrclib::LrcLibClient;
use crate::config::CatalogConfig;

/// User agent string sent with every request
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Tidal image CDN
const COVER_BASE_URL: &str = "https://resources.tidal.com/images";

/// Per-request timeout for API calls (not for audio bodies)
const API_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout used when probing instances
const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Tidal catalog client
pub struct TidalClient {
    http_client: reqwest::Client,
    api_url: String,
    streaming_url: String,
    cover_url: String,
    lyrics: LrcLibClient,
}

impl TidalClient {
    /// Create a client for fixed instances
    ///
    /// The client is configured to:
    /// - Accept gzip-compressed responses
    /// - Give up on stalled connections and reads, but never cap a whole audio download
    pub fn new(
        api_url: impl Into<String>,
        streaming_url: impl Into<String>,
        lyrics_url: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        let http_client = reqwest::Client::builder()
            .gzip(true)
            .user_agent(USER_AGENT)
            .connect_timeout(API_TIMEOUT)
            .read_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CatalogError::Network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            lyrics: LrcLibClient::new(http_client.clone(), lyrics_url),
            http_client,
            api_url: trim_slash(api_url.into()),
            streaming_url: trim_slash(streaming_url.into()),
            cover_url: COVER_BASE_URL.to_string(),
        })
    }

    /// Create a client using the fastest responding configured instances.
    pub async fn connect(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let pinger = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(PING_TIMEOUT)
            .build()
            .map_err(|e| CatalogError::Network(format!("Failed to build HTTP client: {e}")))?;

        let api_url = pick_instance(&pinger, &config.api_instances, "API").await?;
        let streaming_url = pick_instance(&pinger, &config.streaming_instances, "streaming").await?;

        Self::new(api_url, streaming_url, config.lyrics_url.clone())
    }

    /// Search instance in use
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Streaming instance in use
    pub fn streaming_url(&self) -> &str {
        &self.streaming_url
    }

    async fn send_search_request(&self, query: &str) -> Result<dto::SearchResponse, CatalogError> {
        let url = format!("{}/search/?s={}", self.api_url, urlencoding::encode(query));
        let response = self
            .http_client
            .get(&url)
            .timeout(API_TIMEOUT)
            .send()
            .await?;
        check_status(response.status(), query)?;
        response
            .json::<dto::SearchResponse>()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))
    }

    async fn resolve_stream_url(
        &self,
        track_id: u64,
        quality: Quality,
    ) -> Result<String, CatalogError> {
        let url = format!(
            "{}/track/?id={}&quality={}",
            self.streaming_url,
            track_id,
            quality.api_name()
        );
        let response = self
            .http_client
            .get(&url)
            .timeout(API_TIMEOUT)
            .send()
            .await?;
        check_status(response.status(), &format!("track {track_id}"))?;
        let body = response
            .json::<dto::TrackResponse>()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;
        adapter::to_stream_url(body)
    }
}

#[async_trait]
impl CatalogApi for TidalClient {
    async fn search(
        &self,
        title: &str,
        artist: &str,
    ) -> Result<Vec<CandidateTrack>, CatalogError> {
        let query = if artist.is_empty() {
            title.to_string()
        } else {
            format!("{artist} - {title}")
        };
        tracing::debug!("Searching catalog for '{}'", query);
        let response = self.send_search_request(&query).await?;
        Ok(adapter::to_candidates(response))
    }

    async fn get_audio_stream(
        &self,
        track_id: u64,
        quality: Quality,
    ) -> Result<AudioStream, CatalogError> {
        let stream_url = self.resolve_stream_url(track_id, quality).await?;
        let response = self.http_client.get(&stream_url).send().await?;
        check_status(response.status(), &format!("audio for track {track_id}"))?;
        Ok(response.bytes_stream().map_err(CatalogError::from).boxed())
    }

    async fn get_lyrics(&self, track: &CandidateTrack) -> Result<Option<Lyrics>, CatalogError> {
        self.lyrics.get_lyrics(track).await
    }

    async fn get_cover_art(&self, cover_id: &str) -> Result<Vec<u8>, CatalogError> {
        let url = adapter::cover_url(&self.cover_url, cover_id);
        let response = self
            .http_client
            .get(&url)
            .timeout(API_TIMEOUT)
            .send()
            .await?;
        check_status(response.status(), &format!("cover {cover_id}"))?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Map an HTTP status to a catalog error.
fn check_status(status: reqwest::StatusCode, what: &str) -> Result<(), CatalogError> {
    if status.is_success() {
        return Ok(());
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(CatalogError::NotFound(what.to_string()));
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(CatalogError::RateLimited);
    }
    Err(CatalogError::Http {
        status: status.as_u16(),
        message: status.canonical_reason().unwrap_or("Unknown").to_string(),
    })
}

fn trim_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

async fn pick_instance(
    pinger: &reqwest::Client,
    instances: &[String],
    kind: &str,
) -> Result<String, CatalogError> {
    if let Some(url) = select_fastest_instance(pinger, instances).await {
        tracing::info!("{} instance: {}", kind, url);
        return Ok(url);
    }
    let fallback = instances
        .first()
        .cloned()
        .ok_or_else(|| CatalogError::InvalidResponse(format!("no {kind} instances configured")))?;
    tracing::warn!(
        "No {} instance responded, falling back to {}",
        kind,
        fallback
    );
    Ok(fallback)
}

/// Ping every instance concurrently and return the fastest healthy one.
pub async fn select_fastest_instance(
    pinger: &reqwest::Client,
    instances: &[String],
) -> Option<String> {
    let latencies = instances.iter().map(|url| async move {
        let start = Instant::now();
        match pinger.get(url).send().await {
            Ok(response) if response.status().is_success() => Some((start.elapsed(), url.clone())),
            Ok(response) => {
                tracing::debug!("Instance {} answered {}", url, response.status());
                None
            }
            Err(e) => {
                tracing::debug!("Instance {} unreachable: {}", url, e);
                None
            }
        }
    });

    futures::future::join_all(latencies)
        .await
        .into_iter()
        .flatten()
        .min_by_key(|(elapsed, _)| *elapsed)
        .map(|(_, url)| url)
}
