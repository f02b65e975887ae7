// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-process lock protocol specs.

use silo_engine::lock::{LockManager, LOCK_FILE_NAME};
use std::sync::Arc;

// Beyond Linux's PID_MAX_LIMIT; can never name a live process.
const DEAD_PID: i32 = 4_194_305;

fn write_stale_lock(dir: &std::path::Path) {
    let lock = serde_json::json!({
        "process_id": DEAD_PID,
        "created_at": "2026-01-01T00:00:00Z",
        "directory": dir,
        "status": "active",
        "lock_file_path": dir.join(LOCK_FILE_NAME),
    });
    std::fs::write(dir.join(LOCK_FILE_NAME), serde_json::to_vec(&lock).unwrap()).unwrap();
}

#[test]
fn at_most_one_holder_under_contention() {
    let dir = Arc::new(tempfile::tempdir().unwrap());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let dir = Arc::clone(&dir);
            std::thread::spawn(move || LockManager::new().acquire(dir.path()).is_ok())
        })
        .collect();

    let acquired = handles
        .into_iter()
        .map(|h| h.join().unwrap_or(false))
        .filter(|ok| *ok)
        .count();
    assert_eq!(acquired, 1, "exactly one contender may win the lock");
    assert!(dir.path().join(LOCK_FILE_NAME).exists());
}

#[test]
fn orphan_is_reclaimed_in_a_single_acquire() {
    let dir = tempfile::tempdir().unwrap();
    write_stale_lock(dir.path());

    // Scenario: the previous owner died without releasing. One acquire
    // call detects the dead pid, deletes the artifact, and wins.
    let manager = LockManager::new();
    let guard = manager.acquire(dir.path()).unwrap();
    assert_eq!(guard.lock_file().process_id, std::process::id() as i32);
    manager.release(guard).unwrap();
    assert!(!dir.path().join(LOCK_FILE_NAME).exists());
}

#[test]
fn second_instance_is_denied_and_does_not_touch_the_lock() {
    let dir = tempfile::tempdir().unwrap();
    let first = LockManager::new();
    let guard = first.acquire(dir.path()).unwrap();
    let artifact_before = std::fs::read_to_string(dir.path().join(LOCK_FILE_NAME)).unwrap();

    // A second manager in the same (live) process family.
    let second = LockManager::new();
    assert!(second.acquire(dir.path()).is_err());
    let artifact_after = std::fs::read_to_string(dir.path().join(LOCK_FILE_NAME)).unwrap();
    assert_eq!(artifact_before, artifact_after);

    first.release(guard).unwrap();
}

#[test]
fn locks_in_sibling_directories_are_independent() {
    let d1 = tempfile::tempdir().unwrap();
    let d2 = tempfile::tempdir().unwrap();
    let manager = LockManager::new();

    let g1 = manager.acquire(d1.path()).unwrap();
    let g2 = manager.acquire(d2.path()).unwrap();

    assert!(d1.path().join(LOCK_FILE_NAME).exists());
    assert!(d2.path().join(LOCK_FILE_NAME).exists());
    // Neither artifact names the other directory.
    let l1 = manager.inspect(d1.path()).unwrap().unwrap();
    assert_eq!(l1.directory, d1.path());

    manager.release(g1).unwrap();
    manager.release(g2).unwrap();
}

#[test]
fn unparseable_lock_is_reclaimed_once() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(LOCK_FILE_NAME), b"\xff\xfenot-json").unwrap();

    let manager = LockManager::new();
    let guard = manager.acquire(dir.path()).unwrap();
    manager.release(guard).unwrap();
}
