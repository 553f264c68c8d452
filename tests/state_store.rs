use bakeneko::{read_ms, FileStore, InMemoryStore, StateStore, StoreError};
use std::env;
use std::fs;
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    let mut path = env::temp_dir();
    path.push(format!("bakeneko-{}-{name}.json", std::process::id()));
    path
}

#[test]
fn in_memory_store_round_trips_and_removes() {
    let mut store = InMemoryStore::new();
    assert!(store.get("missing").is_none());
    store.set("play_id", "abc").expect("write");
    assert_eq!(store.get("play_id").as_deref(), Some("abc"));
    store.remove("play_id");
    assert!(store.get("play_id").is_none());
}

#[test]
fn quota_store_rejects_oversized_writes() {
    let mut store = InMemoryStore::with_quota(16);
    store.set("k", "small").expect("fits");
    assert_eq!(
        store.set("k2", "definitely too large"),
        Err(StoreError::QuotaExceeded)
    );
    // replacing an existing value is judged against the replacement size
    store.set("k", "tiny").expect("replacement fits");
}

#[test]
fn file_store_persists_across_reopen() {
    let path = temp_path("reopen");
    let _ = fs::remove_file(&path);
    {
        let mut store = FileStore::open(&path);
        store.set("session_id", "sess-1").expect("write");
        store.set("backoff_ms", "2000").expect("write");
        store.remove("backoff_ms");
    }
    let store = FileStore::open(&path);
    assert_eq!(store.get("session_id").as_deref(), Some("sess-1"));
    assert!(store.get("backoff_ms").is_none());
    let _ = fs::remove_file(&path);
}

#[test]
fn file_store_treats_corrupt_files_as_empty() {
    let path = temp_path("corrupt");
    fs::write(&path, "{ not json").expect("seed corrupt file");
    let store = FileStore::open(&path);
    assert!(store.get("session_id").is_none());
    let _ = fs::remove_file(&path);
}

#[test]
fn read_ms_tolerates_garbage() {
    let mut store = InMemoryStore::new();
    store.set("backoff_until", " 1500 ").expect("write");
    assert_eq!(read_ms(&store, "backoff_until"), Some(1_500));
    store.set("backoff_until", "soon").expect("write");
    assert_eq!(read_ms(&store, "backoff_until"), None);
    assert_eq!(read_ms(&store, "missing"), None);
}
