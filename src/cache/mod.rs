//! Persistent completion cache.
//!
//! Remembers which playlist keys were downloaded (`completed.json`) and which
//! failed (`failed.json`) so a re-run only touches new or retryable entries.
//!
//! # Consistency
//!
//! - A key lives in at most one of the two files; recording one status
//!   removes the other.
//! - Every update is written through to disk with temp-file + rename, so an
//!   interrupted run keeps everything recorded before the interruption.
//! - The in-memory maps sit behind a `parking_lot` mutex that is only held
//!   for the map operation itself. Disk writes are serialized by a second
//!   mutex and always write a snapshot taken after acquiring it, so the file
//!   on disk never goes back in time.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const COMPLETED_FILE: &str = "completed.json";
pub const FAILED_FILE: &str = "failed.json";

/// Terminal status of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Completed,
    Failed,
}

/// One persisted outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub key: String,
    pub status: CacheStatus,
    pub timestamp: DateTime<Utc>,
    /// Final audio file path (completed only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Whether a lyrics sidecar was written
    #[serde(default)]
    pub lyrics: bool,
    /// Whether plain lyrics exist even though they were not written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsynced_available: Option<bool>,
    /// Human-readable failure reason (failed only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_artists: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
}

impl CacheRecord {
    fn failed(key: &str, reason: String) -> Self {
        Self {
            key: key.to_string(),
            status: CacheStatus::Failed,
            timestamp: Utc::now(),
            path: None,
            lyrics: false,
            unsynced_available: None,
            reason: Some(reason),
            catalog_id: None,
            catalog_title: None,
            catalog_artists: None,
            catalog_album: None,
            duration_seconds: None,
        }
    }
}

/// Everything known about a finished download.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletedDetails {
    pub path: PathBuf,
    pub lyrics: bool,
    pub unsynced_available: Option<bool>,
    pub catalog_id: Option<u64>,
    pub catalog_title: Option<String>,
    pub catalog_artists: Vec<String>,
    pub catalog_album: Option<String>,
    pub duration_seconds: Option<u32>,
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub completed: usize,
    pub failed: usize,
    /// Completed records without a lyrics sidecar
    pub missing_lyrics: usize,
}

type RecordMap = BTreeMap<String, CacheRecord>;

#[derive(Debug, Default, Clone)]
struct CacheState {
    completed: RecordMap,
    failed: RecordMap,
}

/// Completion cache backed by two JSON files in one directory.
#[derive(Debug)]
pub struct CompletionCache {
    dir: PathBuf,
    state: Mutex<CacheState>,
    persist_lock: Mutex<()>,
}

impl CompletionCache {
    /// Load the cache from `dir`, creating the directory if needed.
    ///
    /// Missing files are treated as empty; unreadable or corrupt files are an error.
    pub fn load(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| Error::cache(dir, format!("cannot create: {e}")))?;

        let state = CacheState {
            completed: read_records(&dir.join(COMPLETED_FILE), CacheStatus::Completed)?,
            failed: read_records(&dir.join(FAILED_FILE), CacheStatus::Failed)?,
        };
        tracing::debug!(
            "Loaded cache from {}: {} completed, {} failed",
            dir.display(),
            state.completed.len(),
            state.failed.len()
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            state: Mutex::new(state),
            persist_lock: Mutex::new(()),
        })
    }

    /// Cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_completed(&self, key: &str) -> bool {
        self.state.lock().completed.contains_key(key)
    }

    /// Whether the key has a Failed record. Callers decide whether to retry it.
    pub fn is_permanently_failed(&self, key: &str) -> bool {
        self.state.lock().failed.contains_key(key)
    }

    /// Record a successful download, replacing any Failed record.
    pub fn record_completed(&self, key: &str, details: CompletedDetails) -> Result<()> {
        let record = CacheRecord {
            key: key.to_string(),
            status: CacheStatus::Completed,
            timestamp: Utc::now(),
            path: Some(details.path),
            lyrics: details.lyrics,
            unsynced_available: details.unsynced_available,
            reason: None,
            catalog_id: details.catalog_id,
            catalog_title: details.catalog_title,
            catalog_artists: Some(details.catalog_artists).filter(|a| !a.is_empty()),
            catalog_album: details.catalog_album,
            duration_seconds: details.duration_seconds,
        };
        {
            let mut state = self.state.lock();
            state.failed.remove(key);
            state.completed.insert(key.to_string(), record);
        }
        self.persist()
    }

    /// Record a failure, replacing any Completed record.
    pub fn record_failed(&self, key: &str, reason: impl Into<String>) -> Result<()> {
        let record = CacheRecord::failed(key, reason.into());
        {
            let mut state = self.state.lock();
            state.completed.remove(key);
            state.failed.insert(key.to_string(), record);
        }
        self.persist()
    }

    /// Completed record for a key, if any.
    pub fn completed_record(&self, key: &str) -> Option<CacheRecord> {
        self.state.lock().completed.get(key).cloned()
    }

    /// All Completed records, ordered by key.
    pub fn completed_records(&self) -> Vec<CacheRecord> {
        self.state.lock().completed.values().cloned().collect()
    }

    /// All Failed records, ordered by key.
    pub fn failed_records(&self) -> Vec<CacheRecord> {
        self.state.lock().failed.values().cloned().collect()
    }

    /// Remove whatever record the key has.
    pub fn remove(&self, key: &str) -> Result<Option<CacheRecord>> {
        let removed = {
            let mut state = self.state.lock();
            let completed = state.completed.remove(key);
            let failed = state.failed.remove(key);
            completed.or(failed)
        };
        if removed.is_some() {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Every key with a record, sorted.
    pub fn keys(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut keys: Vec<String> = state
            .completed
            .keys()
            .chain(state.failed.keys())
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            completed: state.completed.len(),
            failed: state.failed.len(),
            missing_lyrics: state.completed.values().filter(|r| !r.lyrics).count(),
        }
    }

    /// Update the lyrics outcome of a Completed record.
    ///
    /// Returns `false` when the key has no Completed record.
    pub fn update_lyrics(
        &self,
        key: &str,
        lyrics: bool,
        unsynced_available: Option<bool>,
    ) -> Result<bool> {
        let updated = {
            let mut state = self.state.lock();
            match state.completed.get_mut(key) {
                Some(record) => {
                    record.lyrics = lyrics;
                    record.unsynced_available = unsynced_available;
                    true
                }
                None => false,
            }
        };
        if updated {
            self.persist()?;
        }
        Ok(updated)
    }

    /// Rewrite both files from memory.
    pub fn flush(&self) -> Result<()> {
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let _guard = self.persist_lock.lock();
        let snapshot = self.state.lock().clone();
        write_records(&self.dir.join(COMPLETED_FILE), &snapshot.completed)?;
        write_records(&self.dir.join(FAILED_FILE), &snapshot.failed)
    }
}

fn read_records(path: &Path, status: CacheStatus) -> Result<RecordMap> {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(RecordMap::new()),
        Err(e) => return Err(Error::cache(path, format!("cannot read: {e}"))),
    };
    if contents.iter().all(u8::is_ascii_whitespace) {
        return Ok(RecordMap::new());
    }

    let mut records: RecordMap = serde_json::from_slice(&contents)
        .map_err(|e| Error::cache(path, format!("invalid JSON: {e}")))?;
    // The map key is authoritative
    for (key, record) in records.iter_mut() {
        record.key.clone_from(key);
        record.status = status;
    }
    Ok(records)
}

fn write_records(path: &Path, records: &RecordMap) -> Result<()> {
    let json = serde_json::to_vec_pretty(records)
        .map_err(|e| Error::cache(path, format!("cannot serialize: {e}")))?;
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, json)
        .map_err(|e| Error::cache(&temp_path, format!("cannot write: {e}")))?;
    fs::rename(&temp_path, path).map_err(|e| Error::cache(path, format!("cannot replace: {e}")))
}
