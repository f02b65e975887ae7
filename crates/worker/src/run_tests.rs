// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use silo_core::config::Config;
use silo_core::error::ErrorKind;
use silo_core::event::{RunReport, TerminalStatus, WorkerEvent, WorkerStage};
use silo_engine::lock::{LockManager, LOCK_FILE_NAME};
use silo_engine::test_support::MockStore;
use silo_remote::facade::VectorStore;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn test_config() -> Config {
    let mut config = Config::default();
    config.retry.base_delay = 0.001;
    config.retry.max_delay = 0.005;
    config.retry.max_attempts = 2;
    config
}

struct Finished {
    status: TerminalStatus,
    events: Vec<WorkerEvent>,
    store: Arc<MockStore>,
}

async fn run_worker(dir: &Path, store: Arc<MockStore>, cancel: CancellationToken) -> Finished {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let ctx = WorkerContext {
        directory: dir.to_path_buf(),
        config: test_config(),
        facade: Arc::clone(&store) as Arc<dyn VectorStore>,
        cancel,
        events: tx,
    };
    let status = run(ctx).await;

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    Finished { status, events, store }
}

fn terminal(finished: &Finished) -> (TerminalStatus, RunReport) {
    finished
        .events
        .iter()
        .find_map(|e| match e {
            WorkerEvent::Terminal { status, report } => Some((*status, report.clone())),
            _ => None,
        })
        .expect("worker must emit a Terminal event")
}

#[tokio::test]
async fn clean_run_locks_processes_and_releases() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.md"), "# H\n\nbody\n").unwrap();

    let finished =
        run_worker(dir.path(), Arc::new(MockStore::new()), CancellationToken::new()).await;

    assert_eq!(finished.status, TerminalStatus::Clean);
    assert_eq!(finished.status.exit_code(), 0);
    assert!(!dir.path().join(LOCK_FILE_NAME).exists(), "lock must be released");

    let (status, report) = terminal(&finished);
    assert_eq!(status, TerminalStatus::Clean);
    assert_eq!(report.files_processed, 1);
    assert_eq!(report.chunks_committed, 2);

    // Locking is the first stage on the stream.
    let first_stage = finished.events.iter().find_map(|e| match e {
        WorkerEvent::StageChanged { stage } => Some(*stage),
        _ => None,
    });
    assert_eq!(first_stage, Some(WorkerStage::Locking));
}

#[tokio::test]
async fn live_lock_means_lock_denied_without_touching_it() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.md"), "body\n").unwrap();

    // A live process (ours) already owns the directory.
    let holder = LockManager::new();
    let guard = holder.acquire(dir.path()).unwrap();
    let before = std::fs::read_to_string(dir.path().join(LOCK_FILE_NAME)).unwrap();

    let finished =
        run_worker(dir.path(), Arc::new(MockStore::new()), CancellationToken::new()).await;

    assert_eq!(finished.status, TerminalStatus::LockDenied);
    assert_eq!(finished.status.exit_code(), 1);
    let after = std::fs::read_to_string(dir.path().join(LOCK_FILE_NAME)).unwrap();
    assert_eq!(before, after, "denied worker must not touch the lock");
    assert_eq!(finished.store.commit_calls.load(Ordering::SeqCst), 0);

    holder.release(guard).unwrap();
}

#[tokio::test]
async fn orphan_lock_is_reclaimed_and_the_run_proceeds() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.md"), "body\n").unwrap();
    let stale = serde_json::json!({
        "process_id": 4_194_305,
        "created_at": "2026-01-01T00:00:00Z",
        "directory": dir.path(),
        "status": "active",
        "lock_file_path": dir.path().join(LOCK_FILE_NAME),
    });
    std::fs::write(dir.path().join(LOCK_FILE_NAME), serde_json::to_vec(&stale).unwrap()).unwrap();

    let finished =
        run_worker(dir.path(), Arc::new(MockStore::new()), CancellationToken::new()).await;

    assert_eq!(finished.status, TerminalStatus::Clean);
    assert!(!dir.path().join(LOCK_FILE_NAME).exists());
    let (_, report) = terminal(&finished);
    assert_eq!(report.files_processed, 1);
}

#[tokio::test]
async fn unreachable_store_fails_the_run_but_releases_the_lock() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.md"), "body\n").unwrap();

    let store = Arc::new(MockStore::new());
    store.list_unavailable.store(true, Ordering::SeqCst);
    let finished = run_worker(dir.path(), store, CancellationToken::new()).await;

    assert_eq!(finished.status, TerminalStatus::Failed);
    assert_eq!(finished.status.exit_code(), 2);
    assert!(!dir.path().join(LOCK_FILE_NAME).exists());

    let (_, report) = terminal(&finished);
    assert!(!report.errors.is_empty());
    assert_eq!(report.errors[0].kind, ErrorKind::UpstreamUnavailable);
}

#[tokio::test]
async fn pre_cancelled_worker_exits_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.md"), "body\n").unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let finished = run_worker(dir.path(), Arc::new(MockStore::new()), cancel).await;

    assert_eq!(finished.status, TerminalStatus::Cancelled);
    assert_eq!(finished.status.exit_code(), 3);
    assert!(!dir.path().join(LOCK_FILE_NAME).exists(), "no lock may be left behind");
}

#[tokio::test]
async fn per_file_failures_still_exit_clean() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.md"), "# H\n\nbody\n").unwrap();
    std::fs::write(dir.path().join("b.md"), "other\n").unwrap();

    let store = Arc::new(MockStore::new());
    // a.md commits first (call 1); make it fail through both attempts...
    store.fail_commit_call(1);
    store.fail_commit_call(2);
    store.fail_commit_call(3);
    let finished = run_worker(dir.path(), store, CancellationToken::new()).await;

    // ...but the worker still exits 0: per-file failures are absorbed.
    assert_eq!(finished.status, TerminalStatus::Clean);
    let (_, report) = terminal(&finished);
    assert_eq!(report.files_failed, 1);
    assert_eq!(report.files_processed, 1);
}
