//! Text normalization for cross-catalog comparison.
//!
//! Spotify and Tidal disagree on punctuation, accents, featured-artist
//! credits and remaster suffixes. Everything here strips that noise so the
//! similarity measure only sees the words that identify a recording.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Bracketed credits: "(feat. X)", "[with X]", "{ft X}"
static BRACKETED_FEATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[(\[{]\s*(?:with|feat\.?|ft\.?|featuring)\s+[^)\]}]*[)\]}]")
        .expect("valid regex")
});

/// Inline credits up to the next dash or bracket: "Song feat. X - Live"
static INLINE_FEATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:feat\.?|ft\.|featuring)\s+[^\-()\[\]]+").expect("valid regex")
});

/// "Song - Remastered 2009", "Song - 2011 Remaster"
static DASH_REMASTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+[-–]\s+[^-–]*\bremaster(?:ed)?\b.*$").expect("valid regex")
});

/// "(Remastered 2009)", "[2011 Remaster]"
static BRACKETED_REMASTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[(\[][^)\]]*\bremaster(?:ed)?\b[^)\]]*[)\]]").expect("valid regex")
});

static VERSION_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:remaster(?:ed)?|radio edit|single version|album version|version)\b")
        .expect("valid regex")
});

/// Soundtrack suffixes: "Song - From \"Film\"", "(From Film)"
static FROM_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s+[-–]\s+from\s+.*$|[(\[]\s*from\s+[^)\]]*[)\]]"#).expect("valid regex")
});

/// Edition noise in album titles: "(Deluxe Edition)", "- 2009 Remaster"
static ALBUM_EDITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)[(\[][^)\]]*\b(?:remaster(?:ed)?|edition|deluxe|expanded|anniversary|version)\b[^)\]]*[)\]]|\s+[-–]\s+[^-–]*\b(?:remaster(?:ed)?|edition|deluxe|expanded|anniversary|version)\b.*$",
    )
    .expect("valid regex")
});

/// Words in a title that mark a different cut of a song.
const EDIT_MARKERS: [&str; 6] = ["remix", "edit", "slowed", "instrumental", "karaoke", "acapella"];

/// Phrases in an album title that mark a compilation.
const COMPILATION_MARKERS: [&str; 8] = [
    "greatest hits",
    "best of",
    "anthology",
    "compilation",
    "collection",
    "box set",
    "hits",
    "classics",
];

/// Lowercase, strip diacritics, replace punctuation with spaces and collapse whitespace.
///
/// Apostrophes are dropped rather than spaced so "Don't" and "Dont" agree.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
    {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else if c != '\'' && c != '’' {
            pending_space = true;
        }
    }

    out
}

/// Remove featured-artist credits from a title, keeping the rest as-is.
pub fn strip_features(title: &str) -> String {
    let without = BRACKETED_FEATURE.replace_all(title, "");
    let without = INLINE_FEATURE.replace_all(&without, "");
    collapse_spaces(&without)
}

/// Normalized title with credits, remaster and version noise removed.
pub fn clean_title(title: &str) -> String {
    let cleaned = strip_features(title);
    let cleaned = FROM_SUFFIX.replace_all(&cleaned, "");
    let cleaned = DASH_REMASTER.replace_all(&cleaned, "");
    let cleaned = BRACKETED_REMASTER.replace_all(&cleaned, "");
    let cleaned = VERSION_NOISE.replace_all(&cleaned, "");
    let normalized = normalize(&cleaned);

    // A title that is nothing but noise ("Version") keeps its words
    if normalized.is_empty() {
        normalize(title)
    } else {
        normalized
    }
}

/// Normalized album title with edition and remaster noise removed.
pub fn clean_album(album: &str) -> String {
    let cleaned = ALBUM_EDITION.replace_all(album, "");
    let normalized = normalize(&cleaned);
    if normalized.is_empty() {
        normalize(album)
    } else {
        normalized
    }
}

/// Edit markers ("remix", "slowed", ...) present in a title.
pub fn edit_markers(title: &str) -> Vec<&'static str> {
    let normalized = normalize(title);
    let mut found: Vec<&'static str> = EDIT_MARKERS
        .iter()
        .copied()
        .filter(|marker| normalized.split(' ').any(|word| word == *marker))
        .collect();
    if normalized.contains("sped up") {
        found.push("sped up");
    }
    found
}

/// Whether the catalog title is a different cut than the source title.
///
/// "Song (Radio Edit)" is rejected for a source "Song", but accepted for a
/// source that is itself "Song - Radio Edit".
pub fn is_unwanted_edit(source_title: &str, candidate_title: &str) -> bool {
    let source = edit_markers(source_title);
    edit_markers(candidate_title)
        .iter()
        .any(|marker| !source.contains(marker))
}

/// Whether an album title names a compilation ("Greatest Hits", "The Best Of ...").
pub fn is_compilation(album: &str) -> bool {
    let padded = format!(" {} ", normalize(album));
    COMPILATION_MARKERS
        .iter()
        .any(|marker| padded.contains(&format!(" {marker} ")))
}

fn collapse_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_accents_and_punctuation() {
        assert_eq!(normalize("Beyoncé"), "beyonce");
        assert_eq!(normalize("  AC/DC  "), "ac dc");
        assert_eq!(normalize("Sigur Rós"), "sigur ros");
        assert_eq!(normalize("Don't Stop Me Now!"), "dont stop me now");
        assert_eq!(normalize("Y.M.C.A."), "y m c a");
        assert_eq!(normalize("---"), "");
    }

    #[test]
    fn test_strip_features() {
        assert_eq!(strip_features("Stay (feat. Justin Bieber)"), "Stay");
        assert_eq!(strip_features("Stay [with Justin Bieber]"), "Stay");
        assert_eq!(strip_features("Forever ft. Drake - Live"), "Forever - Live");
        assert_eq!(strip_features("Feather"), "Feather");
    }

    #[test]
    fn test_clean_title_removes_remaster_noise() {
        assert_eq!(clean_title("Yesterday - Remastered"), "yesterday");
        assert_eq!(clean_title("Yesterday - Remastered 2009"), "yesterday");
        assert_eq!(clean_title("Yesterday (Remastered 2009)"), "yesterday");
        assert_eq!(clean_title("Let It Be - 2021 Remaster"), "let it be");
        assert_eq!(clean_title("Heroes - Single Version"), "heroes");
    }

    #[test]
    fn test_clean_title_removes_soundtrack_suffix() {
        assert_eq!(
            clean_title("Let It Go - From \"Frozen\"/Soundtrack Version"),
            "let it go"
        );
        assert_eq!(clean_title("Circle of Life (From The Lion King)"), "circle of life");
    }

    #[test]
    fn test_clean_title_keeps_noise_only_titles() {
        assert_eq!(clean_title("Version"), "version");
    }

    #[test]
    fn test_clean_album() {
        assert_eq!(clean_album("Help! (Remastered)"), "help");
        assert_eq!(clean_album("Abbey Road (Super Deluxe Edition)"), "abbey road");
        assert_eq!(clean_album("Rumours - 2004 Remaster"), "rumours");
        assert_eq!(clean_album("Help!"), "help");
    }

    #[test]
    fn test_compilation_detection() {
        assert!(is_compilation("1 (Remastered) - Greatest Hits"));
        assert!(is_compilation("The Best of Queen"));
        assert!(is_compilation("Anthology 1"));
        assert!(!is_compilation("Abbey Road"));
        assert!(!is_compilation("Whitney"));
        assert!(!is_compilation("Classical Gas"));
    }

    #[test]
    fn test_edit_detection() {
        assert!(is_unwanted_edit("Levels", "Levels (Skrillex Remix)"));
        assert!(is_unwanted_edit("Song", "Song - Radio Edit"));
        assert!(is_unwanted_edit("Song", "Song (Slowed)"));
        assert!(is_unwanted_edit("Song", "Song - Sped Up"));
        assert!(!is_unwanted_edit("Levels (Skrillex Remix)", "Levels - Skrillex Remix"));
        assert!(!is_unwanted_edit("Yesterday", "Yesterday - Remastered"));
        // "credit" is not "edit"
        assert!(!is_unwanted_edit("Song", "Closing Credits"));
    }
}
