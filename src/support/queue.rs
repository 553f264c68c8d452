use crate::store::{keys, read_ms, StateStore, StoreError};
use serde::{Deserialize, Serialize};

/// Maximum persisted backlog; the oldest entry is evicted beyond this.
pub const MAX_QUEUE_LENGTH: usize = 10;
/// When the store rejects a write for lack of space, keep only this many of
/// the newest entries and try once more.
pub const QUOTA_TRIM_LENGTH: usize = 3;

/// Base retry delay for queue flushing.
pub const BACKOFF_BASE_MS: u64 = 1_000;
/// Retry delays never exceed this.
pub const BACKOFF_CEILING_MS: u64 = 30_000;

/// One deferred support increment. The idempotency key was minted when the
/// logical increment was first attempted and is reused on every replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportQueueEntry {
    #[serde(rename = "gameId")]
    pub game_id: String,
    #[serde(rename = "idempotencyKey")]
    pub idempotency_key: String,
}

/// Reads the persisted queue. A corrupt payload is dropped and reads empty.
pub fn load_queue(store: &mut dyn StateStore) -> Vec<SupportQueueEntry> {
    let Some(raw) = store.get(keys::PENDING_SUPPORT_QUEUE) else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<SupportQueueEntry>>(&raw) {
        Ok(entries) => entries,
        Err(_) => {
            store.remove(keys::PENDING_SUPPORT_QUEUE);
            Vec::new()
        }
    }
}

/// Persists the queue; an empty queue clears the key. On a quota rejection
/// the newest `QUOTA_TRIM_LENGTH` entries are retried once. Returns whether
/// anything was durably saved.
pub fn save_queue(store: &mut dyn StateStore, queue: &[SupportQueueEntry]) -> bool {
    if queue.is_empty() {
        store.remove(keys::PENDING_SUPPORT_QUEUE);
        return true;
    }
    let payload = match serde_json::to_string(queue) {
        Ok(payload) => payload,
        Err(_) => return false,
    };
    match store.set(keys::PENDING_SUPPORT_QUEUE, &payload) {
        Ok(()) => true,
        Err(StoreError::QuotaExceeded) => {
            let tail_start = queue.len().saturating_sub(QUOTA_TRIM_LENGTH);
            match serde_json::to_string(&queue[tail_start..]) {
                Ok(trimmed) => store.set(keys::PENDING_SUPPORT_QUEUE, &trimmed).is_ok(),
                Err(_) => false,
            }
        }
        Err(_) => false,
    }
}

/// Appends an entry, evicting the oldest beyond the cap, and persists.
/// Returns the resulting queue length and whether the save stuck.
pub fn push_entry(store: &mut dyn StateStore, entry: SupportQueueEntry) -> (usize, bool) {
    let mut queue = load_queue(store);
    queue.push(entry);
    if queue.len() > MAX_QUEUE_LENGTH {
        let excess = queue.len() - MAX_QUEUE_LENGTH;
        queue.drain(..excess);
    }
    let saved = save_queue(store, &queue);
    (queue.len(), saved)
}

/// Persisted retry schedule for queue flushing. `backoff_ms` is the delay to
/// apply after the next failure; `until_ms` is when sending may resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffState {
    pub backoff_ms: u64,
    pub until_ms: u64,
}

/// Active backoff window, if one is still in the future.
pub fn load_backoff(store: &dyn StateStore, now_ms: u64) -> Option<BackoffState> {
    let until_ms = read_ms(store, keys::BACKOFF_UNTIL)?;
    if now_ms >= until_ms {
        return None;
    }
    let backoff_ms = read_ms(store, keys::BACKOFF_MS)
        .unwrap_or(BACKOFF_BASE_MS)
        .min(BACKOFF_CEILING_MS);
    Some(BackoffState {
        backoff_ms,
        until_ms,
    })
}

pub fn save_backoff(store: &mut dyn StateStore, backoff_ms: u64, until_ms: u64) {
    let _ = store.set(keys::BACKOFF_MS, &backoff_ms.to_string());
    let _ = store.set(keys::BACKOFF_UNTIL, &until_ms.to_string());
}

pub fn clear_backoff(store: &mut dyn StateStore) {
    store.remove(keys::BACKOFF_MS);
    store.remove(keys::BACKOFF_UNTIL);
}

/// Doubles a delay up to the ceiling.
pub fn next_backoff(current_ms: u64) -> u64 {
    current_ms
        .max(BACKOFF_BASE_MS)
        .saturating_mul(2)
        .min(BACKOFF_CEILING_MS)
}
