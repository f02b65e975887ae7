// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end pipeline specs against the in-memory store.

use silo_core::chunk::is_uuid_v4;
use silo_core::config::Config;
use silo_core::event::RunReport;
use silo_engine::test_support::MockStore;
use silo_engine::DirectoryPipeline;
use silo_remote::facade::VectorStore;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn config() -> Config {
    let mut config = Config::default();
    config.retry.base_delay = 0.001;
    config.retry.max_delay = 0.005;
    config
}

async fn index(store: &Arc<MockStore>, dir: &Path, config: Config) -> Result<RunReport, String> {
    let (tx, _rx) = mpsc::unbounded_channel();
    let pipeline = DirectoryPipeline::new(
        Arc::clone(store) as Arc<dyn VectorStore>,
        config,
        CancellationToken::new(),
        tx,
    );
    let mut report = RunReport::default();
    pipeline.run(dir, &mut report).await.map(|()| report).map_err(|e| e.to_string())
}

#[tokio::test]
async fn committed_chunks_share_a_valid_source_id_and_path() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("a.md"),
        "# One\n\npara a\n\npara b\n\n## Two\n\npara c\n",
    )
    .unwrap();
    let store = Arc::new(MockStore::new());

    let report = index(&store, dir.path(), config()).await.unwrap();
    assert_eq!(report.chunks_committed, 5);

    // Invariant: one syntactically valid UUIDv4 per file; all chunks of
    // the source share the id and the path.
    let committed = store.committed_chunks();
    let ids: HashSet<_> = committed.iter().map(|c| c.source_id.as_str()).collect();
    assert_eq!(ids.len(), 1);
    assert!(ids.iter().all(|id| is_uuid_v4(id)));
    let paths: HashSet<_> = committed.iter().map(|c| c.source_path.clone()).collect();
    assert_eq!(paths.len(), 1);
}

#[tokio::test]
async fn failed_commit_leaves_no_trace_of_the_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("doomed.md"), "# H\n\none\n\ntwo\n\nthree\n").unwrap();

    let store = Arc::new(MockStore::new());
    let mut config = config();
    config.chunking.max_blocks_per_batch = 2;
    // Second batch fails through every retry.
    for call in 2..=4 {
        store.fail_commit_call(call);
    }

    let report = index(&store, dir.path(), config).await.unwrap();
    assert_eq!(report.files_failed, 1);

    // Invariant: after a failed commit, no chunks with the file's
    // source_id remain visible.
    assert!(store.committed_chunks().is_empty());
    assert!(store.delete_calls.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn unchanged_files_are_not_recommitted() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.md"), "# Stable\n\ncontent\n").unwrap();
    let store = Arc::new(MockStore::new());

    let first = index(&store, dir.path(), config()).await.unwrap();
    assert_eq!(first.files_processed, 1);
    let commits_after_first = store.commit_calls.load(Ordering::SeqCst);

    // Feed the store's own knowledge back as the indexed state.
    let committed = store.committed_chunks();
    let hash = silo_engine::hash::sha256_file(&dir.path().join("a.md")).unwrap();
    *store.indexed.lock() = vec![silo_core::file::IndexedFileRecord {
        path: dir.path().join("a.md"),
        indexed_at_ms: 1,
        mtime_ms: 0,
        chunk_count: committed.len() as u64,
        status: "INDEXED".to_string(),
        content_hash: Some(hash),
    }];

    // Idempotence: reprocessing the unchanged file issues no commits.
    let second = index(&store, dir.path(), config()).await.unwrap();
    assert_eq!(second.files_skipped, 1);
    assert_eq!(second.chunks_committed, 0);
    assert_eq!(store.commit_calls.load(Ordering::SeqCst), commits_after_first);
}

#[tokio::test]
async fn delete_by_source_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "some text\n").unwrap();
    let store = Arc::new(MockStore::new());
    index(&store, dir.path(), config()).await.unwrap();

    let source_id = store.committed_chunks()[0].source_id.clone();
    let cancel = CancellationToken::new();

    let first = store.delete_by_source(&source_id, &cancel).await.unwrap();
    assert_eq!(first, 1);
    // Repeats observe the same final state and keep succeeding.
    for _ in 0..3 {
        assert_eq!(store.delete_by_source(&source_id, &cancel).await.unwrap(), 0);
    }
    assert!(store.committed_chunks().is_empty());
}
