//! LRCLIB HTTP client
//!
//! Looks up synced and plain lyrics by track signature.
//! See: https://lrclib.net/docs

use reqwest::StatusCode;

use super::dto;
use crate::catalog::domain::{CandidateTrack, CatalogError, Lyrics};

/// LRCLIB lyrics client
pub struct LrcLibClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl LrcLibClient {
    /// Create a client sharing an existing connection pool
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
        }
    }

    /// Fetch lyrics for a catalog track.
    ///
    /// Returns `Ok(None)` if LRCLIB has no entry (404) or the entry has no text.
    pub async fn get_lyrics(&self, track: &CandidateTrack) -> Result<Option<Lyrics>, CatalogError> {
        let url = self.lyrics_url(track);
        tracing::debug!("Fetching lyrics: {}", url);

        let response = self.http_client.get(&url).send().await?;

        match response.status() {
            StatusCode::OK => {
                let body = response.json::<dto::LyricsResponse>().await?;
                Ok(to_lyrics(body))
            }
            StatusCode::NOT_FOUND => {
                tracing::debug!("Lyrics not found for: {} - {}", track.artist, track.title);
                Ok(None)
            }
            StatusCode::TOO_MANY_REQUESTS => Err(CatalogError::RateLimited),
            status => Err(CatalogError::Http {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            }),
        }
    }

    fn lyrics_url(&self, track: &CandidateTrack) -> String {
        let mut url = format!(
            "{}?track_name={}&artist_name={}&album_name={}",
            self.base_url,
            urlencoding::encode(&track.title),
            urlencoding::encode(&track.artist_credit()),
            urlencoding::encode(&track.album),
        );
        if let Some(duration) = track.duration_seconds {
            url.push_str(&format!("&duration={duration}"));
        }
        url
    }
}

fn to_lyrics(body: dto::LyricsResponse) -> Option<Lyrics> {
    let non_empty = |s: Option<String>| s.filter(|text| !text.trim().is_empty());
    let lyrics = Lyrics {
        synced: non_empty(body.synced_lyrics),
        plain: non_empty(body.plain_lyrics),
    };
    (lyrics.synced.is_some() || lyrics.plain.is_some()).then_some(lyrics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> LrcLibClient {
        LrcLibClient::new(reqwest::Client::new(), "https://lrclib.net/api/get")
    }

    #[test]
    fn test_lyrics_url_encodes_signature() {
        let track = CandidateTrack {
            title: "Don't Stop Me Now".into(),
            artist: "Queen".into(),
            artists: vec!["Queen".into()],
            album: "Jazz".into(),
            duration_seconds: Some(209),
            ..Default::default()
        };
        let url = client().lyrics_url(&track);
        assert_eq!(
            url,
            "https://lrclib.net/api/get?track_name=Don%27t%20Stop%20Me%20Now&artist_name=Queen&album_name=Jazz&duration=209"
        );
    }

    #[test]
    fn test_lyrics_url_without_duration() {
        let track = CandidateTrack {
            title: "Song".into(),
            artist: "A".into(),
            artists: vec!["A".into(), "B".into()],
            ..Default::default()
        };
        let url = client().lyrics_url(&track);
        assert!(url.contains("artist_name=A%2C%20B"));
        assert!(!url.contains("duration"));
    }

    #[test]
    fn test_blank_lyrics_are_none() {
        let body = dto::LyricsResponse {
            id: Some(1),
            track_name: None,
            artist_name: None,
            album_name: None,
            duration: None,
            instrumental: true,
            plain_lyrics: Some("  ".into()),
            synced_lyrics: None,
        };
        assert!(to_lyrics(body).is_none());
    }

    #[test]
    fn test_plain_only_lyrics() {
        let body = dto::LyricsResponse {
            id: Some(1),
            track_name: None,
            artist_name: None,
            album_name: None,
            duration: None,
            instrumental: false,
            plain_lyrics: Some("la la la".into()),
            synced_lyrics: None,
        };
        let lyrics = to_lyrics(body).unwrap();
        assert!(lyrics.synced.is_none());
        assert_eq!(lyrics.plain.as_deref(), Some("la la la"));
    }
}
