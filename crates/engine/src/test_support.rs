// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory vector store for pipeline tests.
//!
//! Behaves like the real facade (ordered segmentation/embedding, batch
//! commits, idempotent deletes) with injectable failures per call site.

use async_trait::async_trait;
use parking_lot::Mutex;
use silo_core::chunk::Chunk;
use silo_core::file::IndexedFileRecord;
use silo_remote::client::RemoteError;
use silo_remote::facade::{CommitReceipt, HealthReport, ServiceHealth, VectorStore};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct MockStore {
    /// What `list_files` reports.
    pub indexed: Mutex<Vec<IndexedFileRecord>>,
    /// Chunks visible in the store.
    pub committed: Mutex<Vec<Chunk>>,

    pub list_calls: AtomicU32,
    pub segment_calls: AtomicU32,
    pub embed_calls: AtomicU32,
    pub commit_calls: AtomicU32,
    pub delete_calls: AtomicU32,

    /// 1-based commit call numbers that fail with `Unavailable`.
    pub fail_commit_calls: Mutex<HashSet<u32>>,
    /// When set, every `list_files` call fails with `Unavailable`.
    pub list_unavailable: AtomicBool,
    /// When set, `embed` drops the last chunk (cardinality mismatch).
    pub embed_drops_one: AtomicBool,
    /// When set, `delete_by_source` reports `NotFound` upstream-style.
    pub delete_not_found: AtomicBool,
    /// Cancel this token right after the given 1-based commit call.
    pub cancel_on_commit: Mutex<Option<(u32, CancellationToken)>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indexed(records: Vec<IndexedFileRecord>) -> Self {
        let store = Self::default();
        *store.indexed.lock() = records;
        store
    }

    pub fn fail_commit_call(&self, call: u32) {
        self.fail_commit_calls.lock().insert(call);
    }

    pub fn cancel_on_commit_call(&self, call: u32, token: CancellationToken) {
        *self.cancel_on_commit.lock() = Some((call, token));
    }

    pub fn committed_chunks(&self) -> Vec<Chunk> {
        self.committed.lock().clone()
    }

    pub fn chunks_with_source(&self, source_id: &str) -> usize {
        self.committed.lock().iter().filter(|c| c.source_id == source_id).count()
    }

    fn unavailable(&self, service: &str) -> RemoteError {
        RemoteError::Unavailable { service: service.to_string(), detail: "injected".to_string() }
    }
}

#[async_trait]
impl VectorStore for MockStore {
    async fn list_files(
        &self,
        dir: &Path,
        _cancel: &CancellationToken,
    ) -> Result<Vec<IndexedFileRecord>, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.list_unavailable.load(Ordering::SeqCst) {
            return Err(self.unavailable("store"));
        }
        let records =
            self.indexed.lock().iter().filter(|r| r.path.starts_with(dir)).cloned().collect();
        Ok(records)
    }

    async fn segment(
        &self,
        chunks: Vec<Chunk>,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Chunk>, RemoteError> {
        self.segment_calls.fetch_add(1, Ordering::SeqCst);
        Ok(chunks)
    }

    async fn embed(
        &self,
        mut chunks: Vec<Chunk>,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Chunk>, RemoteError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if self.embed_drops_one.load(Ordering::SeqCst) {
            chunks.pop();
        }
        Ok(chunks)
    }

    async fn commit_chunks(
        &self,
        chunks: &[Chunk],
        _cancel: &CancellationToken,
    ) -> Result<CommitReceipt, RemoteError> {
        let call = self.commit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_commit_calls.lock().contains(&call) {
            return Err(self.unavailable("store"));
        }
        let mut committed = self.committed.lock();
        let mut ids = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            committed.push(chunk.clone());
            ids.push(format!("chunk-{}", committed.len()));
        }
        drop(committed);

        if let Some((when, token)) = self.cancel_on_commit.lock().as_ref() {
            if *when == call {
                token.cancel();
            }
        }
        Ok(CommitReceipt { created: chunks.len() as u64, ids })
    }

    async fn delete_by_source(
        &self,
        source_id: &str,
        _cancel: &CancellationToken,
    ) -> Result<u64, RemoteError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.delete_not_found.load(Ordering::SeqCst) {
            return Ok(0);
        }
        let mut committed = self.committed.lock();
        let before = committed.len();
        committed.retain(|c| c.source_id != source_id);
        Ok((before - committed.len()) as u64)
    }

    async fn health(&self) -> HealthReport {
        HealthReport {
            services: vec![
                ServiceHealth { service: "store".to_string(), ok: true, detail: None },
                ServiceHealth { service: "segmentation".to_string(), ok: true, detail: None },
                ServiceHealth { service: "embedding".to_string(), ok: true, detail: None },
            ],
        }
    }
}
