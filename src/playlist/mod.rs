//! Exported Spotify playlist reader.
//!
//! Reads Exportify-style CSV files. Header lookup is case-insensitive and a
//! UTF-8 byte order mark is tolerated. Required columns are `Track Name` and
//! `Artist Name(s)`; `Album Name` and `Duration (ms)` are used when present.
//!
//! Spotify and Tidal spell a handful of names differently, so the known
//! differences are rewritten while loading.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::PlaylistEntry;

const TITLE_COLUMN: &str = "track name";
const ARTIST_COLUMN: &str = "artist name(s)";
const ALBUM_COLUMN: &str = "album name";
const DURATION_COLUMN: &str = "duration (ms)";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Artist,
    Album,
}

/// Spotify spelling, Tidal spelling, field it applies to.
const NAMING_FIXES: &[(&str, &str, Field)] = &[
    ("Â¥$;", "", Field::Artist),
    ("JAY-Z", "JAY Z", Field::Artist),
    ("Original Me", "Everytime We Touch", Field::Album),
    ("YMCA - Original Version 1978", "Y.M.C.A.", Field::Title),
    ("Bad Meets Evil", "Eminem;Royce da 5'9\"", Field::Artist),
];

/// Load every usable entry from a playlist file.
pub fn load(path: &Path) -> Result<Vec<PlaylistEntry>> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::playlist(path, format!("cannot open: {e}")))?;
    let entries = parse(file, path)?;
    tracing::info!("Loaded {} tracks from {}", entries.len(), path.display());
    Ok(entries)
}

/// Parse playlist CSV from any reader. `origin` is only used in errors.
pub fn parse<R: Read>(mut reader: R, origin: &Path) -> Result<Vec<PlaylistEntry>> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| Error::playlist(origin, format!("cannot read: {e}")))?;
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

    let mut csv = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body);

    let headers: HashMap<String, usize> = csv
        .headers()
        .map_err(|e| Error::playlist(origin, format!("invalid header: {e}")))?
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim().to_lowercase(), i))
        .collect();

    let (Some(&title_col), Some(&artist_col)) =
        (headers.get(TITLE_COLUMN), headers.get(ARTIST_COLUMN))
    else {
        let mut found: Vec<&String> = headers.keys().collect();
        found.sort();
        return Err(Error::playlist(
            origin,
            format!("unsupported CSV format, found columns: {found:?}"),
        ));
    };
    let album_col = headers.get(ALBUM_COLUMN).copied();
    let duration_col = headers.get(DURATION_COLUMN).copied();

    let mut entries = Vec::new();
    for (row, record) in csv.records().enumerate() {
        let source_id = row + 1;
        let record =
            record.map_err(|e| Error::playlist(origin, format!("row {source_id}: {e}")))?;
        let cell = |col: usize| record.get(col).unwrap_or("").trim();

        let title = fix_naming(cell(title_col), Field::Title);
        let artist_field = fix_naming(cell(artist_col), Field::Artist);
        let artists: Vec<String> = artist_field
            .split(';')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(String::from)
            .collect();

        let Some(artist) = artists.first().cloned() else {
            tracing::debug!("Skipping row {}: no artist", source_id);
            continue;
        };
        if title.is_empty() {
            tracing::debug!("Skipping row {}: no title", source_id);
            continue;
        }

        let album = album_col
            .map(|col| fix_naming(cell(col), Field::Album))
            .filter(|a| !a.is_empty());
        let duration_seconds = duration_col.and_then(|col| parse_duration_ms(cell(col)));

        entries.push(PlaylistEntry {
            title,
            artist,
            artists,
            album,
            duration_seconds,
            source_id,
        });
    }

    Ok(entries)
}

fn fix_naming(text: &str, field: Field) -> String {
    NAMING_FIXES
        .iter()
        .filter(|(_, _, target)| *target == field)
        .fold(text.to_string(), |acc, (from, to, _)| acc.replace(from, to))
}

/// Milliseconds to whole seconds, rounded.
fn parse_duration_ms(value: &str) -> Option<u32> {
    let ms: u64 = value.parse().ok()?;
    u32::try_from((ms + 500) / 1000).ok()
}
