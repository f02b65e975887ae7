// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read model over the vector store: which files under a directory are
//! already indexed, and does a scanned file need (re)indexing.
//!
//! Pure read — nothing here mutates the store. The snapshot is taken once
//! per scan round and consulted for every candidate file.

use crate::client::RemoteError;
use crate::facade::VectorStore;
use silo_core::file::{FileRecord, IndexedFileRecord};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct IndexSnapshot {
    by_path: BTreeMap<PathBuf, IndexedFileRecord>,
}

impl IndexSnapshot {
    pub fn from_records(records: Vec<IndexedFileRecord>) -> Self {
        let by_path = records.into_iter().map(|r| (r.path.clone(), r)).collect();
        Self { by_path }
    }

    pub fn get(&self, path: &Path) -> Option<&IndexedFileRecord> {
        self.by_path.get(path)
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    /// The diff rule. A file needs (re)indexing when the store has no
    /// record of it, or its content hash differs from the indexed one, or
    /// — when either side lacks a hash — its mtime is strictly newer.
    /// Matching hashes short-circuit to "unchanged" even if the mtime
    /// moved (a touched but identical file is not reprocessed).
    pub fn needs_index(&self, file: &FileRecord) -> bool {
        let Some(indexed) = self.get(&file.path) else {
            return true;
        };
        match (&file.content_hash, &indexed.content_hash) {
            (Some(ours), Some(theirs)) => ours != theirs,
            _ => file.mtime_ms > indexed.mtime_ms,
        }
    }
}

/// Snapshot factory bound to a facade.
pub struct DatabaseView {
    facade: Arc<dyn VectorStore>,
}

impl DatabaseView {
    pub fn new(facade: Arc<dyn VectorStore>) -> Self {
        Self { facade }
    }

    pub async fn snapshot(
        &self,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<IndexSnapshot, RemoteError> {
        let records = self.facade.list_files(dir, cancel).await?;
        Ok(IndexSnapshot::from_records(records))
    }
}

#[cfg(test)]
#[path = "view_tests.rs"]
mod tests;
