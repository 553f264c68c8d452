use crate::store::{keys, read_ms, StateStore};
use uuid::Uuid;

/// Lock lifetime. A holder that stops renewing loses the lock after this.
pub const SUPPORT_LOCK_TTL_MS: u64 = 5_000;

/// Proof of acquisition; renew and release require it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken {
    owner_id: String,
}

impl LockToken {
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

/// Advisory lock over the shared state store. Well-behaved support flows
/// respect it; the store itself enforces nothing. Survives reloads within
/// the TTL because owner and timestamp are persisted.
#[derive(Debug, Clone, Copy)]
pub struct SupportLock {
    ttl_ms: u64,
}

impl Default for SupportLock {
    fn default() -> Self {
        Self {
            ttl_ms: SUPPORT_LOCK_TTL_MS,
        }
    }
}

impl SupportLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl_ms: u64) -> Self {
        Self { ttl_ms }
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    /// Attempts acquisition under a fresh owner id. Refused while another
    /// owner's unexpired claim is present. Store write failures are ignored:
    /// a broken store must not block the user action the lock protects.
    pub fn try_acquire(&self, store: &mut dyn StateStore, now_ms: u64) -> Option<LockToken> {
        self.try_acquire_as(store, now_ms, &Uuid::new_v4().to_string())
    }

    /// Acquisition with an explicit owner id (re-entrant for the same owner).
    pub fn try_acquire_as(
        &self,
        store: &mut dyn StateStore,
        now_ms: u64,
        owner_id: &str,
    ) -> Option<LockToken> {
        let held_ts = read_ms(store, keys::SUPPORT_LOCK_TIMESTAMP);
        let held_owner = store.get(keys::SUPPORT_LOCK_OWNER);
        if let (Some(ts), Some(owner)) = (held_ts, held_owner) {
            if now_ms.saturating_sub(ts) < self.ttl_ms && !owner.is_empty() && owner != owner_id {
                return None;
            }
        }
        let _ = store.set(keys::SUPPORT_LOCK_TIMESTAMP, &now_ms.to_string());
        let _ = store.set(keys::SUPPORT_LOCK_OWNER, owner_id);
        Some(LockToken {
            owner_id: owner_id.to_string(),
        })
    }

    /// Refreshes the claim timestamp; in-progress flows call this at every
    /// network round trip so slow-but-alive work keeps the lock.
    pub fn renew(&self, store: &mut dyn StateStore, token: &LockToken, now_ms: u64) {
        let _ = store.set(keys::SUPPORT_LOCK_TIMESTAMP, &now_ms.to_string());
        let _ = store.set(keys::SUPPORT_LOCK_OWNER, &token.owner_id);
    }

    /// Clears the claim. Safe to call on an already-released lock.
    pub fn release(&self, store: &mut dyn StateStore, _token: &LockToken) {
        store.remove(keys::SUPPORT_LOCK_TIMESTAMP);
        store.remove(keys::SUPPORT_LOCK_OWNER);
    }

    /// True when an unexpired claim by a different owner exists.
    pub fn held_by_other(&self, store: &dyn StateStore, now_ms: u64, owner_id: &str) -> bool {
        match (
            read_ms(store, keys::SUPPORT_LOCK_TIMESTAMP),
            store.get(keys::SUPPORT_LOCK_OWNER),
        ) {
            (Some(ts), Some(owner)) => {
                now_ms.saturating_sub(ts) < self.ttl_ms && !owner.is_empty() && owner != owner_id
            }
            _ => false,
        }
    }
}
