// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The chunking manager: Blocks in, committed chunks out, atomically per
//! file.
//!
//! Phase 1 (prepare) allocates one fresh UUIDv4 for the file, splits
//! block bodies to the configured ceiling, and runs the provisional
//! chunks through segmentation and embedding. Phase 2 (commit) persists
//! the finalized list in ordinal-ordered batches. Any Phase 2 failure —
//! including cancellation — triggers compensation: everything already
//! written under the file's source_id is deleted before the error
//! surfaces. Observably, a file commits completely or not at all.

use crate::handler::ErrorHandler;
use silo_core::block::Block;
use silo_core::chunk::Chunk;
use silo_core::config::ChunkingConfig;
use silo_core::error::{ErrorKind, ProcessingError, Stage};
use silo_core::event::FileOutcome;
use silo_core::file::FileRecord;
use silo_remote::facade::VectorStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use uuid::Uuid;

/// Per-service attempt ceilings, from `upstream.<service>.retries`.
#[derive(Debug, Clone, Copy)]
pub struct UpstreamAttempts {
    pub segmentation: u32,
    pub embedding: u32,
    pub store: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileCommit {
    pub outcome: FileOutcome,
    pub chunks: u64,
}

pub struct ChunkingManager {
    facade: Arc<dyn VectorStore>,
    config: ChunkingConfig,
    attempts: UpstreamAttempts,
}

impl ChunkingManager {
    pub fn new(
        facade: Arc<dyn VectorStore>,
        config: ChunkingConfig,
        attempts: UpstreamAttempts,
    ) -> Self {
        Self { facade, config, attempts }
    }

    /// Process one file's blocks end to end. A returned error means no
    /// chunks for this file remain visible in the store.
    pub async fn process_file(
        &self,
        file: &FileRecord,
        blocks: Vec<Block>,
        handler: &ErrorHandler,
        cancel: &CancellationToken,
    ) -> Result<FileCommit, ProcessingError> {
        if blocks.is_empty() {
            return Ok(FileCommit { outcome: FileOutcome::SkippedEmpty, chunks: 0 });
        }

        let source_id = Uuid::new_v4().to_string();
        let provisional = self.prepare_provisional(file, &blocks, &source_id);
        if provisional.is_empty() {
            return Ok(FileCommit { outcome: FileOutcome::SkippedEmpty, chunks: 0 });
        }

        // Phase 1: segmentation and embedding, batched. Nothing has been
        // written yet, so failures here need no compensation.
        let mut finalized: Vec<Chunk> = Vec::with_capacity(provisional.len());
        for batch in provisional.chunks(self.config.max_blocks_per_batch) {
            let segmented = handler
                .run_capped(Stage::Chunk, Some(&file.path), self.attempts.segmentation, || {
                    self.facade.segment(batch.to_vec(), cancel)
                })
                .await?;

            let embedded = handler
                .run_capped(Stage::Embed, Some(&file.path), self.attempts.embedding, || {
                    self.facade.embed(segmented.clone(), cancel)
                })
                .await?;

            if embedded.len() != segmented.len() {
                return Err(ProcessingError::new(
                    ErrorKind::Rejected,
                    Stage::Embed,
                    format!(
                        "embedding returned {} chunks for {} submitted",
                        embedded.len(),
                        segmented.len()
                    ),
                )
                .for_file(&file.path));
            }
            finalized.extend(embedded);
        }

        // Validate before any write reaches the store.
        for chunk in &finalized {
            if let Err(invalid) = chunk.validate(&source_id) {
                return Err(ProcessingError::new(
                    ErrorKind::Rejected,
                    Stage::Chunk,
                    invalid.to_string(),
                )
                .for_file(&file.path));
            }
        }

        // Phase 2: commit in ordinal order. All-or-nothing from here on.
        let mut committed = 0u64;
        for batch in finalized.chunks(self.config.max_blocks_per_batch) {
            let receipt = match handler
                .run_capped(Stage::Commit, Some(&file.path), self.attempts.store, || {
                    self.facade.commit_chunks(batch, cancel)
                })
                .await
            {
                Ok(receipt) => receipt,
                Err(record) => {
                    self.compensate(&source_id).await;
                    return Err(record);
                }
            };

            if receipt.created != batch.len() as u64 {
                self.compensate(&source_id).await;
                return Err(ProcessingError::new(
                    ErrorKind::PartialFailure,
                    Stage::Commit,
                    format!("store created {} of {} chunks", receipt.created, batch.len()),
                )
                .for_file(&file.path));
            }
            committed += receipt.created;
        }

        debug!(file = %file.path.display(), chunks = committed, %source_id, "file committed");
        Ok(FileCommit { outcome: FileOutcome::Committed, chunks: committed })
    }

    /// Delete everything written under `source_id`. Runs on a detached
    /// token so a cancelled worker still compensates before exiting.
    async fn compensate(&self, source_id: &str) {
        let detached = CancellationToken::new();
        let mut last_err = None;
        for _ in 0..self.attempts.store {
            match self.facade.delete_by_source(source_id, &detached).await {
                Ok(deleted) => {
                    debug!(%source_id, deleted, "compensated partial commit");
                    return;
                }
                Err(e) => last_err = Some(e),
            }
        }
        if let Some(e) = last_err {
            error!(%source_id, error = %e, "compensation failed; orphan chunks may remain");
        }
    }

    fn prepare_provisional(
        &self,
        file: &FileRecord,
        blocks: &[Block],
        source_id: &str,
    ) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for block in blocks {
            for piece in split_body(&block.body, self.config.max_block_size) {
                let mut chunk = Chunk::new(piece, source_id, &file.path);
                chunk
                    .metadata
                    .insert("block_kind".to_string(), serde_json::json!(block.kind.to_string()));
                chunk.metadata.insert("block_ordinal".to_string(), serde_json::json!(block.ordinal));
                chunk.metadata.insert("start".to_string(), serde_json::json!(block.start));
                chunk.metadata.insert("end".to_string(), serde_json::json!(block.end));
                chunk.metadata.insert("start_line".to_string(), serde_json::json!(block.start_line));
                chunk.metadata.insert("end_line".to_string(), serde_json::json!(block.end_line));
                if let Some(title) = &block.title {
                    chunk.metadata.insert("title".to_string(), serde_json::json!(title));
                }
                if let Some(level) = block.heading_level {
                    chunk.metadata.insert("heading_level".to_string(), serde_json::json!(level));
                }
                for (key, value) in &block.attrs {
                    chunk.metadata.insert(key.clone(), serde_json::json!(value));
                }
                if let Some(hash) = &file.content_hash {
                    chunk.metadata.insert("file_sha256".to_string(), serde_json::json!(hash));
                }
                chunks.push(chunk);
            }
        }
        chunks
    }
}

/// Split a body into pieces no longer than `max_bytes`, backing off to
/// char boundaries. Empty bodies produce nothing.
fn split_body(body: &str, max_bytes: usize) -> Vec<String> {
    if body.is_empty() {
        return Vec::new();
    }
    if body.len() <= max_bytes {
        return vec![body.to_string()];
    }

    let mut pieces = Vec::new();
    let mut rest = body;
    while !rest.is_empty() {
        if rest.len() <= max_bytes {
            pieces.push(rest.to_string());
            break;
        }
        let mut cut = max_bytes;
        while cut > 0 && !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        if cut == 0 {
            // A single char wider than the limit; take it whole.
            cut = rest.chars().next().map(char::len_utf8).unwrap_or(rest.len());
        }
        pieces.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }
    pieces
}

#[cfg(test)]
#[path = "chunker_tests.rs"]
mod tests;
