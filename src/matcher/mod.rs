//! Cross-catalog track matching.
//!
//! Scores catalog candidates against a playlist entry and picks the best one.
//!
//! # Scoring
//!
//! Similarity is the Sørensen–Dice coefficient over character bigrams of
//! normalized text ([`normalize`]). For each candidate:
//!
//! ```text
//! score = title_weight * title_sim
//!       + artist_weight * artist_sim
//!       + duration_weight * (2 * closeness - 1)    // only when both durations are known
//! closeness = max(0, 1 - |delta| / duration_tolerance)
//! ```
//!
//! Candidates whose title or artist similarity is below `min_similarity`, or
//! whose title marks an unrequested edit ("Remix", "Sped Up"...), are
//! rejected. Ties on score go to the album match, then to a regular album
//! over a compilation, then the smaller duration delta, then the earlier
//! candidate.

mod normalize;
mod queries;

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::CandidateTrack;
use crate::config::ConfigError;
use crate::model::PlaylistEntry;

pub use normalize::{
    clean_album, clean_title, is_compilation, is_unwanted_edit, normalize, strip_features,
};
pub use queries::{SearchQuery, search_queries};

/// Scores are compared at this resolution so float noise never decides a tie.
const SCORE_QUANTUM: f64 = 1e-6;

/// Matcher tuning, the `[matching]` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct MatchConfig {
    /// Floor for both title and artist similarity
    pub min_similarity: f64,
    pub title_weight: f64,
    pub artist_weight: f64,
    pub duration_weight: f64,
    /// Seconds of difference at which the duration term bottoms out
    pub duration_tolerance: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_similarity: 0.5,
            title_weight: 0.6,
            artist_weight: 0.3,
            duration_weight: 0.1,
            duration_tolerance: 10.0,
        }
    }
}

impl MatchConfig {
    /// Check that weights and thresholds are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("matching.titleWeight", self.title_weight),
            ("matching.artistWeight", self.artist_weight),
            ("matching.durationWeight", self.duration_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::invalid(
                    key,
                    format!("must be a non-negative number, got {value}"),
                ));
            }
        }
        if self.title_weight + self.artist_weight <= 0.0 {
            return Err(ConfigError::invalid(
                "matching.titleWeight",
                "titleWeight and artistWeight cannot both be zero",
            ));
        }
        if !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(ConfigError::invalid(
                "matching.minSimilarity",
                format!("must be between 0 and 1, got {}", self.min_similarity),
            ));
        }
        if !self.duration_tolerance.is_finite() || self.duration_tolerance <= 0.0 {
            return Err(ConfigError::invalid(
                "matching.durationTolerance",
                format!("must be greater than 0, got {}", self.duration_tolerance),
            ));
        }
        Ok(())
    }
}

/// Outcome of matching one entry against one candidate list.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    Matched { track: CandidateTrack, score: f64 },
    NoMatch(NoMatchReason),
}

/// Why no candidate was accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum NoMatchReason {
    /// The catalog returned an empty list
    NoCandidates,
    /// Every candidate was rejected; `best_score` is `None` when all were edits
    BelowThreshold {
        best_score: Option<f64>,
        candidates: usize,
    },
}

impl NoMatchReason {
    /// Keep whichever of two reasons says more about the failure.
    ///
    /// Any `BelowThreshold` beats `NoCandidates`; between two `BelowThreshold`
    /// the higher best score wins.
    pub fn most_informative(self, other: Self) -> Self {
        match (&self, &other) {
            (Self::NoCandidates, _) => other,
            (_, Self::NoCandidates) => self,
            (
                Self::BelowThreshold { best_score: a, .. },
                Self::BelowThreshold { best_score: b, .. },
            ) => {
                if b.unwrap_or(f64::MIN) > a.unwrap_or(f64::MIN) {
                    other
                } else {
                    self
                }
            }
        }
    }
}

impl fmt::Display for NoMatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCandidates => write!(f, "catalog returned zero candidates"),
            Self::BelowThreshold {
                best_score: Some(score),
                candidates,
            } => write!(
                f,
                "no candidate passed the similarity floor ({candidates} candidates, best score {score:.3})"
            ),
            Self::BelowThreshold {
                best_score: None,
                candidates,
            } => write!(f, "all {candidates} candidates were edits or remixes"),
        }
    }
}

/// Why a single candidate was discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    /// Title marks a remix/edit the entry did not ask for
    Edit,
    TitleBelowFloor(f64),
    ArtistBelowFloor(f64),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Edit => write!(f, "unrequested edit"),
            Self::TitleBelowFloor(sim) => write!(f, "title similarity {sim:.3} below floor"),
            Self::ArtistBelowFloor(sim) => write!(f, "artist similarity {sim:.3} below floor"),
        }
    }
}

/// Score breakdown for one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    /// Position in the catalog's candidate list
    pub index: usize,
    pub title_similarity: f64,
    pub artist_similarity: f64,
    /// Absolute duration difference in seconds, when both sides know it
    pub duration_delta: Option<u32>,
    pub album_match: bool,
    /// Candidate comes from a compilation the entry did not ask for
    pub compilation: bool,
    pub score: f64,
    pub rejection: Option<Rejection>,
}

impl CandidateScore {
    fn quantized(&self) -> i64 {
        (self.score / SCORE_QUANTUM).round() as i64
    }
}

/// Score every candidate, in catalog order. Rejected candidates are included.
pub fn score_candidates(
    entry: &PlaylistEntry,
    candidates: &[CandidateTrack],
    config: &MatchConfig,
) -> Vec<CandidateScore> {
    let source_title = clean_title(&entry.title);
    let source_artists: Vec<String> = entry
        .credited_artists()
        .into_iter()
        .map(normalize)
        .collect();
    let source_album = entry
        .album
        .as_deref()
        .map(clean_album)
        .filter(|album| !album.is_empty());
    let source_is_compilation = entry.album.as_deref().is_some_and(is_compilation);

    candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            let title_similarity =
                strsim::sorensen_dice(&source_title, &clean_title(&candidate.title));
            let artist_similarity = artist_similarity(&source_artists, candidate);

            let duration_delta = match (entry.duration_seconds, candidate.duration_seconds) {
                (Some(a), Some(b)) => Some(a.abs_diff(b)),
                _ => None,
            };
            let duration_term = duration_delta.map_or(0.0, |delta| {
                let closeness = (1.0 - f64::from(delta) / config.duration_tolerance).max(0.0);
                config.duration_weight * (2.0 * closeness - 1.0)
            });

            let album_match = source_album
                .as_ref()
                .is_some_and(|album| *album == clean_album(&candidate.album));

            let rejection = if is_unwanted_edit(&entry.title, &candidate.title) {
                Some(Rejection::Edit)
            } else if title_similarity < config.min_similarity {
                Some(Rejection::TitleBelowFloor(title_similarity))
            } else if artist_similarity < config.min_similarity {
                Some(Rejection::ArtistBelowFloor(artist_similarity))
            } else {
                None
            };

            CandidateScore {
                index,
                title_similarity,
                artist_similarity,
                duration_delta,
                album_match,
                compilation: !source_is_compilation && is_compilation(&candidate.album),
                score: config.title_weight * title_similarity
                    + config.artist_weight * artist_similarity
                    + duration_term,
                rejection,
            }
        })
        .collect()
}

/// Pick the best candidate for an entry, or explain why there is none.
pub fn match_entry(
    entry: &PlaylistEntry,
    candidates: &[CandidateTrack],
    config: &MatchConfig,
) -> MatchResult {
    if candidates.is_empty() {
        return MatchResult::NoMatch(NoMatchReason::NoCandidates);
    }

    let scores = score_candidates(entry, candidates, config);

    let best = scores
        .iter()
        .filter(|s| s.rejection.is_none())
        .min_by(|a, b| rank(a, b));

    match best {
        Some(best) => MatchResult::Matched {
            track: candidates[best.index].clone(),
            score: best.score,
        },
        None => {
            let best_score = scores
                .iter()
                .filter(|s| s.rejection != Some(Rejection::Edit))
                .map(|s| s.score)
                .fold(None, |acc: Option<f64>, score| {
                    Some(acc.map_or(score, |best| best.max(score)))
                });
            MatchResult::NoMatch(NoMatchReason::BelowThreshold {
                best_score,
                candidates: candidates.len(),
            })
        }
    }
}

/// Best pairing between the entry's artists and the candidate's artists.
fn artist_similarity(source_artists: &[String], candidate: &CandidateTrack) -> f64 {
    let candidate_artists: Vec<String> = if candidate.artists.is_empty() {
        vec![normalize(&candidate.artist)]
    } else {
        candidate.artists.iter().map(|a| normalize(a)).collect()
    };

    source_artists
        .iter()
        .flat_map(|source| {
            candidate_artists
                .iter()
                .map(move |found| strsim::sorensen_dice(source, found))
        })
        .fold(0.0, f64::max)
}

/// Ordering where `Less` means `a` is the better candidate.
fn rank(a: &CandidateScore, b: &CandidateScore) -> Ordering {
    b.quantized()
        .cmp(&a.quantized())
        .then_with(|| b.album_match.cmp(&a.album_match))
        .then_with(|| a.compilation.cmp(&b.compilation))
        .then_with(|| match (a.duration_delta, b.duration_delta) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.index.cmp(&b.index))
}
