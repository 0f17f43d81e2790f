//! Crash Recovery Tests
//!
//! Simulates crashes at the filesystem level and verifies the startup
//! sequence restores every acknowledged write:
//! - WAL replay of mutations that never reached the main store file
//! - Torn WAL tails discarded without losing earlier records
//! - Torn main store files refusing to open

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use tinykv::{Store, StoreError};

// =============================================================================
// Test Utilities
// =============================================================================

fn store_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("store.data")
}

fn wal_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("wal.log")
}

fn file_len(path: &Path) -> u64 {
    fs::metadata(path).unwrap().len()
}

/// Chops `n` bytes off the end of a file, as a crash mid-append would.
fn tear_tail(path: &Path, n: usize) {
    let contents = fs::read(path).unwrap();
    assert!(contents.len() > n, "file too short to tear");
    fs::write(path, &contents[..contents.len() - n]).unwrap();
}

// =============================================================================
// WAL Replay
// =============================================================================

/// A store dropped without close leaves its mutations in the WAL;
/// the next open replays them all.
#[test]
fn test_unclosed_store_recovers_from_wal() {
    let dir = TempDir::new().unwrap();

    {
        let store = Store::open_path(dir.path()).unwrap();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.delete("a").unwrap();
        // Dropped: no close, WAL retains everything.
    }

    let store = Store::open_path(dir.path()).unwrap();
    assert_eq!(store.get("a").unwrap(), None);
    assert_eq!(store.get("b").unwrap(), Some("2".to_string()));
}

/// Replay appends WAL records to the main store file and then empties
/// the WAL, so a second recovery has nothing left to redo.
#[test]
fn test_replay_is_not_repeated() {
    let dir = TempDir::new().unwrap();

    {
        let store = Store::open_path(dir.path()).unwrap();
        store.set("key", "value").unwrap();
    }

    let store_len_before;
    {
        let store = Store::open_path(dir.path()).unwrap();
        assert_eq!(store.get("key").unwrap(), Some("value".to_string()));
        store_len_before = file_len(&store_path(&dir));
        assert_eq!(file_len(&wal_path(&dir)), 0);
        // Dropped again, with nothing new written.
    }

    // Third open: empty WAL means no growth.
    let store = Store::open_path(dir.path()).unwrap();
    assert_eq!(file_len(&store_path(&dir)), store_len_before);
    assert_eq!(store.get("key").unwrap(), Some("value".to_string()));
}

/// WAL replay observes order: an overwrite followed by a crash
/// recovers the latest value, not the first.
#[test]
fn test_replay_preserves_write_order() {
    let dir = TempDir::new().unwrap();

    {
        let store = Store::open_path(dir.path()).unwrap();
        store.set("seq", "v1").unwrap();
        store.set("seq", "v2").unwrap();
        store.set("seq", "v3").unwrap();
    }

    let store = Store::open_path(dir.path()).unwrap();
    assert_eq!(store.get("seq").unwrap(), Some("v3".to_string()));
}

// =============================================================================
// Torn WAL Tails
// =============================================================================

/// A partial trailing record in the WAL marks a crash mid-append. It
/// is discarded; every complete record before it still recovers.
///
/// Only the WAL is fsynced per write, so the crash state has the main
/// store file's unsynced appends gone and the WAL torn mid-record.
#[test]
fn test_torn_wal_tail_discarded_earlier_records_kept() {
    let dir = TempDir::new().unwrap();

    {
        let store = Store::open_path(dir.path()).unwrap();
        store.set("safe", "landed").unwrap();
        store.set("doomed", "a value that will be torn apart").unwrap();
    }

    // Crash state: store file appends never hit disk, WAL torn
    // partway through the last record.
    fs::write(store_path(&dir), b"").unwrap();
    tear_tail(&wal_path(&dir), 10);

    let store = Store::open_path(dir.path()).unwrap();
    assert_eq!(store.get("safe").unwrap(), Some("landed".to_string()));
    assert_eq!(store.get("doomed").unwrap(), None);
    // The torn tail is gone for good.
    assert_eq!(file_len(&wal_path(&dir)), 0);
}

/// A WAL torn down to a lone flag byte still recovers cleanly with
/// zero records.
#[test]
fn test_wal_torn_inside_header() {
    let dir = TempDir::new().unwrap();

    {
        let store = Store::open_path(dir.path()).unwrap();
        store.set("only", "record").unwrap();
    }

    let wal = wal_path(&dir);
    let len = file_len(&wal);
    fs::write(store_path(&dir), b"").unwrap();
    tear_tail(&wal, (len - 1) as usize);

    let store = Store::open_path(dir.path()).unwrap();
    assert_eq!(store.get("only").unwrap(), None);
    assert!(store.is_empty().unwrap());
}

/// A torn tombstone is discarded like any other torn record: the key
/// it would have deleted stays visible.
#[test]
fn test_torn_tombstone_leaves_key_alive() {
    let dir = TempDir::new().unwrap();

    {
        let store = Store::open_path(dir.path()).unwrap();
        store.set("target", "still here").unwrap();
        store.close().unwrap();
    }
    let durable_store = fs::read(store_path(&dir)).unwrap();

    {
        let store = Store::open_path(dir.path()).unwrap();
        store.delete("target").unwrap();
        assert!(file_len(&wal_path(&dir)) > 0);
    }

    // Crash with the tombstone half-written: the store file append was
    // never synced, the WAL record is incomplete.
    fs::write(store_path(&dir), &durable_store).unwrap();
    tear_tail(&wal_path(&dir), 3);

    let store = Store::open_path(dir.path()).unwrap();
    assert_eq!(store.get("target").unwrap(), Some("still here".to_string()));
}

// =============================================================================
// Main Store File Corruption
// =============================================================================

/// A torn record in the main store file is fatal: open fails rather
/// than serving a partial view.
#[test]
fn test_torn_store_file_fails_open() {
    let dir = TempDir::new().unwrap();

    {
        let store = Store::open_path(dir.path()).unwrap();
        store.set("a", "first record").unwrap();
        store.set("b", "second record, soon torn").unwrap();
        store.close().unwrap();
    }

    tear_tail(&store_path(&dir), 6);

    let err = Store::open_path(dir.path()).unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { .. }));
}

/// Corruption detection is not tail-only: a store file cut inside its
/// first record also refuses to open.
#[test]
fn test_store_file_torn_to_header_fails_open() {
    let dir = TempDir::new().unwrap();

    {
        let store = Store::open_path(dir.path()).unwrap();
        store.set("lonely", "record").unwrap();
        store.close().unwrap();
    }

    let path = store_path(&dir);
    let len = file_len(&path);
    tear_tail(&path, (len - 3) as usize);

    let err = Store::open_path(dir.path()).unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { .. }));
}

/// A zeroed region in the main store file surfaces as corruption at
/// open, never as phantom empty-key records.
#[test]
fn test_zeroed_store_file_region_fails_open() {
    let dir = TempDir::new().unwrap();

    {
        let store = Store::open_path(dir.path()).unwrap();
        store.set("real", "record").unwrap();
        store.close().unwrap();
    }

    let mut contents = fs::read(store_path(&dir)).unwrap();
    contents.extend_from_slice(&[0u8; 32]);
    fs::write(store_path(&dir), &contents).unwrap();

    let err = Store::open_path(dir.path()).unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { .. }));
}

/// A missing data directory is not corruption; open creates it and
/// starts empty.
#[test]
fn test_open_fresh_directory_is_empty() {
    let dir = TempDir::new().unwrap();
    let fresh = dir.path().join("brand-new");

    let store = Store::open_path(&fresh).unwrap();
    assert!(store.is_empty().unwrap());
}
