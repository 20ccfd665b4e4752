//! Explain how one track would be matched.

use anyhow::Context;
use tokio::runtime::Runtime;

use crate::catalog::{CandidateTrack, CatalogApi, TidalClient};
use crate::config::Config;
use crate::matcher::{self, MatchConfig, MatchResult, NoMatchReason};
use crate::model::PlaylistEntry;

/// Search for one track and print every candidate's score and the decision.
pub fn cmd_match(
    rt: &Runtime,
    config: &Config,
    title: &str,
    artist: &str,
    album: Option<&str>,
    duration: Option<u32>,
) -> anyhow::Result<()> {
    let entry = entry_from_args(title, artist, album, duration);

    rt.block_on(async {
        let catalog = TidalClient::connect(&config.catalog)
            .await
            .context("Failed to connect to the catalog")?;
        for line in explain(&catalog, &entry, &config.matching).await? {
            println!("{line}");
        }
        anyhow::Ok(())
    })
}

fn entry_from_args(
    title: &str,
    artist: &str,
    album: Option<&str>,
    duration: Option<u32>,
) -> PlaylistEntry {
    let artists: Vec<String> = artist
        .split(';')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect();

    PlaylistEntry {
        title: title.trim().to_string(),
        artist: artists.first().cloned().unwrap_or_default(),
        artists,
        album: album.map(str::to_string),
        duration_seconds: duration,
        source_id: 0,
    }
}

/// Run the same query fallbacks as the downloader, reporting as it goes.
async fn explain(
    catalog: &dyn CatalogApi,
    entry: &PlaylistEntry,
    matching: &MatchConfig,
) -> anyhow::Result<Vec<String>> {
    let mut lines = Vec::new();
    let mut reason = NoMatchReason::NoCandidates;

    let mut last_error = None;
    let mut answered = false;

    for query in matcher::search_queries(entry) {
        let candidates = match catalog.search(&query.title, &query.artist).await {
            Ok(candidates) => candidates,
            Err(e) => {
                lines.push(format!("Query '{query}': search failed: {e}"));
                last_error = Some(e);
                continue;
            }
        };
        answered = true;
        lines.push(format!("Query '{query}': {} candidates", candidates.len()));
        lines.extend(score_lines(entry, &candidates, matching));

        match matcher::match_entry(entry, &candidates, matching) {
            MatchResult::Matched { track, score } => {
                lines.push(format!(
                    "Match: {} - {} [{}] (id {}, score {:.3})",
                    track.artist_credit(),
                    track.title,
                    track.album,
                    track.id,
                    score
                ));
                return Ok(lines);
            }
            MatchResult::NoMatch(no_match) => reason = reason.most_informative(no_match),
        }
    }

    if let (false, Some(e)) = (answered, last_error) {
        return Err(e).context("Every search query failed");
    }
    lines.push(format!("No match: {reason}"));
    Ok(lines)
}

fn score_lines(
    entry: &PlaylistEntry,
    candidates: &[CandidateTrack],
    matching: &MatchConfig,
) -> Vec<String> {
    matcher::score_candidates(entry, candidates, matching)
        .into_iter()
        .map(|s| {
            let track = &candidates[s.index];
            let duration = s
                .duration_delta
                .map_or_else(|| "?".to_string(), |d| format!("{d}s"));
            let verdict = s
                .rejection
                .map_or_else(|| "ok".to_string(), |r| r.to_string());
            format!(
                "  {:>2}. {} - {} | title {:.2} artist {:.2} duration {} album {} | {:.3} {}",
                s.index + 1,
                track.artist_credit(),
                track.title,
                s.title_similarity,
                s.artist_similarity,
                duration,
                if s.album_match { "yes" } else { "no" },
                s.score,
                verdict
            )
        })
        .collect()
}
