//! Device-local cache for the leaderboard and scores awaiting sync.
//!
//! The cache is a plain string key-value store, the way a browser's local
//! storage is. [`LocalStore`] layers the leaderboard codec on top of it and
//! never fails a read: a missing, unreadable or corrupt entry reads as empty.

use crate::error::LocalStoreError;
use snakeboard_engine::{reconcile, snapshot, Leaderboard, ScoreRecord};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Synchronous string key-value storage.
pub trait KeyValueStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError>;
}

/// In-memory key-value store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding one raw entry.
    pub fn with_entry(key: &str, value: &str) -> Self {
        let kv = Self::new();
        kv.lock().insert(key.to_string(), value.to_string());
        kv
    }

    /// Raw value stored under `key`.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// File-backed key-value store: one `<key>.json` file per key.
///
/// Writes go to a temporary file that is then renamed over the target, so a
/// crash mid-write leaves the previous value in place.
#[derive(Debug, Clone)]
pub struct FileKv {
    dir: PathBuf,
}

impl FileKv {
    /// Open (and create if needed) a cache directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, LocalStoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, LocalStoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(LocalStoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Typed access to the cached leaderboard and the pending-sync queue.
#[derive(Debug, Clone)]
pub struct LocalStore<K> {
    kv: K,
}

impl<K: KeyValueStore> LocalStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    /// The cached leaderboard; empty if missing or unreadable.
    pub fn get(&self) -> Leaderboard {
        match self.kv.get(snapshot::LEADERBOARD_KEY) {
            Ok(Some(json)) => snapshot::decode_leaderboard(&json).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Discarding unreadable leaderboard cache");
                Leaderboard::new()
            }),
            Ok(None) => Leaderboard::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read leaderboard cache");
                Leaderboard::new()
            }
        }
    }

    /// Replace the cached leaderboard.
    pub fn set(&self, board: &Leaderboard) -> Result<(), LocalStoreError> {
        let json = snapshot::encode_leaderboard(board)?;
        self.kv.set(snapshot::LEADERBOARD_KEY, &json)
    }

    /// Scores saved while the remote store was unavailable.
    pub fn pending(&self) -> Vec<ScoreRecord> {
        match self.kv.get(snapshot::PENDING_KEY) {
            Ok(Some(json)) => snapshot::decode_records(&json).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Discarding unreadable pending scores");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read pending scores");
                Vec::new()
            }
        }
    }

    pub fn set_pending(&self, records: &[ScoreRecord]) -> Result<(), LocalStoreError> {
        let json = snapshot::encode_records(records)?;
        self.kv.set(snapshot::PENDING_KEY, &json)
    }

    /// Queue a score for sync. Only each player's best pending score is kept.
    pub fn push_pending(&self, record: ScoreRecord) -> Result<(), LocalStoreError> {
        let mut pending = self.pending();
        pending.push(record);
        let pending = reconcile::reduce(pending).into_records();
        self.set_pending(&pending)
    }

    /// Remove synced records from the queue. Records queued since they were
    /// read are kept.
    pub fn remove_pending(&self, synced: &[ScoreRecord]) -> Result<(), LocalStoreError> {
        if synced.is_empty() {
            return Ok(());
        }
        let remaining: Vec<ScoreRecord> = self
            .pending()
            .into_iter()
            .filter(|record| !synced.contains(record))
            .collect();
        self.set_pending(&remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snakeboard_engine::{PlayerName, LEADERBOARD_KEY, PENDING_KEY};
    use tempfile::TempDir;

    fn record(player: &str, score: u64) -> ScoreRecord {
        ScoreRecord::new(PlayerName::parse(player).unwrap(), score, 0)
    }

    #[test]
    fn empty_store_reads_empty() {
        let store = LocalStore::new(MemoryKv::new());
        assert!(store.get().is_empty());
        assert!(store.pending().is_empty());
    }

    #[test]
    fn corrupt_cache_reads_empty() {
        let kv = MemoryKv::with_entry(LEADERBOARD_KEY, "{\"oops\":");
        kv.set(PENDING_KEY, "not json").unwrap();
        let store = LocalStore::new(kv);
        assert!(store.get().is_empty());
        assert!(store.pending().is_empty());
    }

    #[test]
    fn leaderboard_roundtrip_through_file() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(FileKv::open(dir.path()).unwrap());
        let board = Leaderboard::from_records(vec![record("Maya", 120), record("Alex", 150)]);
        store.set(&board).unwrap();

        let reopened = LocalStore::new(FileKv::open(dir.path()).unwrap());
        assert_eq!(reopened.get(), board);
        assert!(dir.path().join("snakeLeaderboard.json").exists());
        assert!(!dir.path().join("snakeLeaderboard.json.tmp").exists());
    }

    #[test]
    fn pending_keeps_best_per_player() {
        let store = LocalStore::new(MemoryKv::new());
        store.push_pending(record("Alex", 200)).unwrap();
        store.push_pending(record("Alex", 180)).unwrap();
        store.push_pending(record("Sam", 40)).unwrap();

        let pending = store.pending();
        assert_eq!(pending, vec![record("Alex", 200), record("Sam", 40)]);
    }

    #[test]
    fn remove_pending_keeps_newer_records() {
        let store = LocalStore::new(MemoryKv::new());
        store
            .set_pending(&[record("Alex", 200), record("Sam", 40)])
            .unwrap();
        store.remove_pending(&[record("Alex", 200)]).unwrap();
        assert_eq!(store.pending(), vec![record("Sam", 40)]);
    }

    #[test]
    fn file_kv_rejects_path_like_keys() {
        let dir = TempDir::new().unwrap();
        let kv = FileKv::open(dir.path()).unwrap();
        assert!(matches!(
            kv.set("../escape", "x"),
            Err(LocalStoreError::InvalidKey(_))
        ));
        assert_eq!(kv.get("missing").unwrap(), None);
    }
}
