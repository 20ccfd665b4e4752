//! Search query fallback list for one playlist entry.

use super::normalize::strip_features;
use crate::model::PlaylistEntry;

/// One (title, artist) pair to send to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub title: String,
    /// Empty for a title-only search
    pub artist: String,
}

impl SearchQuery {
    fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
        }
    }
}

impl std::fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.artist.is_empty() {
            write!(f, "{}", self.title)
        } else {
            write!(f, "{} - {}", self.artist, self.title)
        }
    }
}

/// Ordered, deduplicated queries for an entry, most specific first.
///
/// 1. title + primary artist
/// 2. title + every credited artist joined by `;`
/// 3. title without featured credits + primary artist
/// 4. title without its trailing ` - ...` suffix + primary artist
/// 5. title alone
pub fn search_queries(entry: &PlaylistEntry) -> Vec<SearchQuery> {
    let title = entry.title.trim();
    let artist = entry.artist.trim();

    let mut candidates = vec![SearchQuery::new(title, artist)];

    if entry.artists.len() > 1 {
        candidates.push(SearchQuery::new(title, entry.artists.join(";")));
    }

    candidates.push(SearchQuery::new(strip_features(title), artist));

    if let Some((head, _)) = title.split_once(" - ") {
        candidates.push(SearchQuery::new(head.trim(), artist));
    }

    candidates.push(SearchQuery::new(title, ""));

    let mut queries: Vec<SearchQuery> = Vec::with_capacity(candidates.len());
    for query in candidates {
        if !query.title.is_empty() && !queries.contains(&query) {
            queries.push(query);
        }
    }
    queries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_entry_has_two_queries() {
        let entry = PlaylistEntry::new("Yesterday", "The Beatles");
        let queries = search_queries(&entry);
        assert_eq!(
            queries,
            vec![
                SearchQuery::new("Yesterday", "The Beatles"),
                SearchQuery::new("Yesterday", ""),
            ]
        );
    }

    #[test]
    fn test_full_fallback_order() {
        let mut entry = PlaylistEntry::new("Stay (feat. Justin Bieber) - Remix", "The Kid LAROI");
        entry.artists = vec!["The Kid LAROI".into(), "Justin Bieber".into()];

        let queries = search_queries(&entry);
        assert_eq!(
            queries,
            vec![
                SearchQuery::new("Stay (feat. Justin Bieber) - Remix", "The Kid LAROI"),
                SearchQuery::new(
                    "Stay (feat. Justin Bieber) - Remix",
                    "The Kid LAROI;Justin Bieber"
                ),
                SearchQuery::new("Stay - Remix", "The Kid LAROI"),
                SearchQuery::new("Stay (feat. Justin Bieber)", "The Kid LAROI"),
                SearchQuery::new("Stay (feat. Justin Bieber) - Remix", ""),
            ]
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(SearchQuery::new("Song", "Artist").to_string(), "Artist - Song");
        assert_eq!(SearchQuery::new("Song", "").to_string(), "Song");
    }
}
