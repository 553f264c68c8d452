use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Persisted-state keys shared across subsystems. All values are
/// string-encoded so any string key/value backend can hold them.
pub mod keys {
    pub const SUPPORT_LOCK_TIMESTAMP: &str = "support_lock_timestamp";
    pub const SUPPORT_LOCK_OWNER: &str = "support_lock_owner";
    pub const PENDING_SUPPORT_QUEUE: &str = "pending_support_queue";
    pub const BACKOFF_MS: &str = "backoff_ms";
    pub const BACKOFF_UNTIL: &str = "backoff_until";
    pub const FALLBACK_TODAY_SUPPORT: &str = "fallback_today_support";
    pub const PLAY_ID: &str = "play_id";
    pub const SUPPORTED_PLAY_ID: &str = "supported_play_id";
    pub const SESSION_ID: &str = "session_id";
}

/// Error raised by a storage backend on write.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage quota exceeded")]
    QuotaExceeded,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// String key/value store backing locks, queues and counters. Injectable so
/// tests run against an in-memory map.
pub trait StateStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str);
}

/// In-memory backend used by tests and by processes that opt out of
/// persistence. An optional byte quota models constrained storage.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    entries: BTreeMap<String, String>,
    quota_bytes: Option<usize>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects writes once total value bytes would exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            quota_bytes: Some(bytes),
        }
    }

    fn used_bytes_excluding(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl StateStore for InMemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if let Some(quota) = self.quota_bytes {
            if self.used_bytes_excluding(key) + key.len() + value.len() > quota {
                return Err(StoreError::QuotaExceeded);
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// File-backed store: one JSON object per file, rewritten on every mutation.
/// Read errors surface as an empty store; write errors as `Unavailable`.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str::<BTreeMap<String, String>>(&raw).ok())
            .unwrap_or_default();
        Self { path, entries }
    }

    fn persist(&self) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&self.entries)
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        fs::write(&self.path, payload).map_err(|err| StoreError::Unavailable(err.to_string()))
    }
}

impl StateStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.persist()
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        let _ = self.persist();
    }
}

/// Parses a stored millisecond timestamp; malformed values read as absent.
pub fn read_ms(store: &dyn StateStore, key: &str) -> Option<u64> {
    store.get(key).and_then(|raw| raw.trim().parse::<u64>().ok())
}
