//! Playlist sync: forget and delete tracks that left the playlist.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::cache::CompletionCache;
use crate::error::{Result, ResultExt};
use crate::metadata;

/// What a sync pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Cache keys that were cleared
    pub removed_keys: Vec<String>,
    /// Audio and lyric files that were deleted
    pub removed_files: Vec<PathBuf>,
    pub removed_dirs: usize,
}

/// Remove every cached key that is not in `playlist_keys`.
///
/// Completed records lose their audio file and lyric sidecars, unless a key
/// that stays in the playlist points at the same file. Files outside
/// `download_root` are never touched. Empty directories left behind under
/// `download_root` are pruned.
pub fn cleanup(
    cache: &CompletionCache,
    playlist_keys: &HashSet<String>,
    download_root: &Path,
) -> Result<SyncReport> {
    let mut report = SyncReport::default();

    let kept_paths: HashSet<PathBuf> = cache
        .completed_records()
        .into_iter()
        .filter(|record| playlist_keys.contains(&record.key))
        .filter_map(|record| record.path)
        .collect();

    for key in cache.keys() {
        if playlist_keys.contains(&key) {
            continue;
        }

        if let Some(audio) = cache.completed_record(&key).and_then(|r| r.path) {
            if kept_paths.contains(&audio) {
                tracing::debug!("Keeping {} for {}: still in use", audio.display(), key);
            } else if audio.starts_with(download_root) {
                let [lrc, txt] = metadata::lyrics_sidecars(&audio);
                for path in [audio, lrc, txt] {
                    if remove_if_exists(&path) {
                        report.removed_files.push(path);
                    }
                }
            } else {
                tracing::warn!(
                    "Not deleting {} for {}: outside {}",
                    audio.display(),
                    key,
                    download_root.display()
                );
            }
        }

        cache
            .remove(&key)
            .with_context(format!("Failed to clear {key} from the cache"))?;
        tracing::info!("Removed {} (no longer in playlist)", key);
        report.removed_keys.push(key);
    }

    if !report.removed_files.is_empty() {
        report.removed_dirs = prune_empty_dirs(download_root);
    }
    Ok(report)
}

fn remove_if_exists(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!("Failed to delete {}: {}", path.display(), e);
            false
        }
    }
}

/// Remove empty directories below `root` (never `root` itself), deepest first.
fn prune_empty_dirs(root: &Path) -> usize {
    WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .filter(|e| {
            fs::read_dir(e.path())
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(false)
        })
        .filter(|e| fs::remove_dir(e.path()).is_ok())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CompletedDetails;
    use tempfile::TempDir;

    fn completed_at(cache: &CompletionCache, key: &str, path: PathBuf) {
        cache
            .record_completed(
                key,
                CompletedDetails {
                    path,
                    ..Default::default()
                },
            )
            .unwrap();
    }

    #[test]
    fn test_cleanup_removes_tracks_not_in_playlist() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("downloads");
        let cache = CompletionCache::load(&dir.path().join("cache")).unwrap();

        let keep = root.join("Adele/25/Hello.m4a");
        let gone = root.join("Old Artist/Old Album/Old Song.m4a");
        for path in [&keep, &gone] {
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"audio").unwrap();
        }
        fs::write(gone.with_extension("lrc"), b"[00:00.00]").unwrap();

        completed_at(&cache, "adele - hello", keep.clone());
        completed_at(&cache, "old artist - old song", gone.clone());
        cache.record_failed("someone - failed song", "no match").unwrap();

        let playlist: HashSet<String> = ["adele - hello".to_string()].into();
        let report = cleanup(&cache, &playlist, &root).unwrap();

        assert_eq!(report.removed_keys.len(), 2);
        assert_eq!(report.removed_files.len(), 2);
        assert_eq!(report.removed_dirs, 2);
        assert!(keep.exists());
        assert!(!gone.exists());
        assert!(!root.join("Old Artist").exists());
        assert!(root.exists());
        assert_eq!(cache.keys(), vec!["adele - hello"]);
    }

    #[test]
    fn test_cleanup_never_deletes_outside_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("downloads");
        fs::create_dir_all(&root).unwrap();
        let outside = dir.path().join("precious.m4a");
        fs::write(&outside, b"audio").unwrap();

        let cache = CompletionCache::load(&dir.path().join("cache")).unwrap();
        completed_at(&cache, "x - y", outside.clone());

        let report = cleanup(&cache, &HashSet::new(), &root).unwrap();
        assert!(outside.exists());
        assert_eq!(report.removed_keys, vec!["x - y"]);
        assert!(report.removed_files.is_empty());
    }

    #[test]
    fn test_cleanup_keeps_file_shared_with_kept_key() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("downloads");
        let cache = CompletionCache::load(&dir.path().join("cache")).unwrap();

        let shared = root.join("The Beatles/Help!/Yesterday.m4a");
        fs::create_dir_all(shared.parent().unwrap()).unwrap();
        fs::write(&shared, b"audio").unwrap();
        fs::write(shared.with_extension("lrc"), b"[00:00.00]").unwrap();
        completed_at(&cache, "the beatles - yesterday", shared.clone());
        completed_at(&cache, "beatles - yesterday", shared.clone());

        let playlist: HashSet<String> = ["the beatles - yesterday".to_string()].into();
        let report = cleanup(&cache, &playlist, &root).unwrap();

        assert_eq!(report.removed_keys, vec!["beatles - yesterday"]);
        assert!(report.removed_files.is_empty());
        assert!(shared.exists());
        assert!(shared.with_extension("lrc").exists());
        assert!(cache.is_completed("the beatles - yesterday"));
    }

    #[test]
    fn test_cleanup_noop_when_playlist_unchanged() {
        let dir = TempDir::new().unwrap();
        let cache = CompletionCache::load(dir.path()).unwrap();
        cache.record_failed("a - b", "no match").unwrap();

        let playlist: HashSet<String> = ["a - b".to_string()].into();
        let report = cleanup(&cache, &playlist, dir.path()).unwrap();
        assert_eq!(report, SyncReport::default());
        assert!(cache.is_permanently_failed("a - b"));
    }
}
