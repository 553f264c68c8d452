use bakeneko::{keys, InMemoryStore, StateStore, SupportLock, SUPPORT_LOCK_TTL_MS};

#[test]
fn acquire_writes_owner_and_timestamp() {
    let mut store = InMemoryStore::new();
    let lock = SupportLock::new();
    let token = lock.try_acquire(&mut store, 1_000).expect("free lock");
    assert_eq!(
        store.get(keys::SUPPORT_LOCK_OWNER).as_deref(),
        Some(token.owner_id())
    );
    assert_eq!(
        store.get(keys::SUPPORT_LOCK_TIMESTAMP).as_deref(),
        Some("1000")
    );
}

#[test]
fn second_owner_is_refused_while_the_claim_is_fresh() {
    let mut store = InMemoryStore::new();
    let lock = SupportLock::new();
    let _token = lock
        .try_acquire_as(&mut store, 1_000, "tab-a")
        .expect("free lock");
    assert!(lock
        .try_acquire_as(&mut store, 1_000 + SUPPORT_LOCK_TTL_MS - 1, "tab-b")
        .is_none());
}

#[test]
fn stale_claim_is_stealable_after_the_ttl() {
    let mut store = InMemoryStore::new();
    let lock = SupportLock::new();
    let _token = lock
        .try_acquire_as(&mut store, 1_000, "tab-a")
        .expect("free lock");
    let token = lock
        .try_acquire_as(&mut store, 1_000 + SUPPORT_LOCK_TTL_MS, "tab-b")
        .expect("stale claim is free");
    assert_eq!(token.owner_id(), "tab-b");
    assert_eq!(store.get(keys::SUPPORT_LOCK_OWNER).as_deref(), Some("tab-b"));
}

#[test]
fn same_owner_reenters_its_own_claim() {
    let mut store = InMemoryStore::new();
    let lock = SupportLock::new();
    lock.try_acquire_as(&mut store, 1_000, "tab-a")
        .expect("free lock");
    assert!(lock.try_acquire_as(&mut store, 1_001, "tab-a").is_some());
}

#[test]
fn renew_extends_the_claim_lifetime() {
    let mut store = InMemoryStore::new();
    let lock = SupportLock::new();
    let token = lock
        .try_acquire_as(&mut store, 1_000, "tab-a")
        .expect("free lock");
    lock.renew(&mut store, &token, 4_000);
    // without the renewal this acquisition at 6 500 would have succeeded
    assert!(lock.try_acquire_as(&mut store, 6_500, "tab-b").is_none());
    assert!(lock
        .try_acquire_as(&mut store, 4_000 + SUPPORT_LOCK_TTL_MS, "tab-b")
        .is_some());
}

#[test]
fn release_clears_both_keys() {
    let mut store = InMemoryStore::new();
    let lock = SupportLock::new();
    let token = lock.try_acquire(&mut store, 1_000).expect("free lock");
    lock.release(&mut store, &token);
    assert!(store.get(keys::SUPPORT_LOCK_OWNER).is_none());
    assert!(store.get(keys::SUPPORT_LOCK_TIMESTAMP).is_none());
    assert!(lock.try_acquire(&mut store, 1_001).is_some());
}

#[test]
fn corrupt_timestamp_reads_as_free() {
    let mut store = InMemoryStore::new();
    store
        .set(keys::SUPPORT_LOCK_TIMESTAMP, "yesterday")
        .expect("seed timestamp");
    store
        .set(keys::SUPPORT_LOCK_OWNER, "tab-a")
        .expect("seed owner");
    let lock = SupportLock::new();
    assert!(lock.try_acquire_as(&mut store, 1_000, "tab-b").is_some());
}

#[test]
fn held_by_other_tracks_owner_and_ttl() {
    let mut store = InMemoryStore::new();
    let lock = SupportLock::new();
    lock.try_acquire_as(&mut store, 1_000, "tab-a")
        .expect("free lock");
    assert!(lock.held_by_other(&store, 2_000, "tab-b"));
    assert!(!lock.held_by_other(&store, 2_000, "tab-a"));
    assert!(!lock.held_by_other(&store, 1_000 + SUPPORT_LOCK_TTL_MS, "tab-b"));
}
