// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The final unit persisted to the vector store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Chunk lifecycle status. Commits always carry `NEW`; later states are
/// owned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkStatus {
    #[serde(rename = "NEW")]
    New,
    #[serde(rename = "INDEXED")]
    Indexed,
    #[serde(rename = "DELETED")]
    Deleted,
}

/// Wire schema: `body`, `source_id`, `source_path`, `status`, plus
/// optional metadata forwarded verbatim from the originating block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub body: String,
    /// UUIDv4, identical across every chunk of one file.
    pub source_id: String,
    /// Absolute path of the originating file.
    pub source_path: PathBuf,
    pub status: ChunkStatus,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkInvalid {
    #[error("chunk for {path} has an empty body")]
    EmptyBody { path: PathBuf },

    #[error("source_id '{source_id}' is not a valid UUIDv4")]
    BadSourceId { source_id: String },

    #[error("chunk source_id '{found}' does not match file source_id '{expected}'")]
    SourceIdMismatch { expected: String, found: String },
}

impl Chunk {
    pub fn new(body: impl Into<String>, source_id: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            body: body.into(),
            source_id: source_id.into(),
            source_path: source_path.into(),
            status: ChunkStatus::New,
            metadata: BTreeMap::new(),
        }
    }

    /// Pre-dispatch validation: non-empty body, syntactically valid
    /// UUIDv4 `source_id` matching the file's.
    pub fn validate(&self, expected_source_id: &str) -> Result<(), ChunkInvalid> {
        if self.body.is_empty() {
            return Err(ChunkInvalid::EmptyBody { path: self.source_path.clone() });
        }
        if !is_uuid_v4(&self.source_id) {
            return Err(ChunkInvalid::BadSourceId { source_id: self.source_id.clone() });
        }
        if self.source_id != expected_source_id {
            return Err(ChunkInvalid::SourceIdMismatch {
                expected: expected_source_id.to_string(),
                found: self.source_id.clone(),
            });
        }
        Ok(())
    }
}

/// Syntactic UUIDv4 check, the invariant behind every `source_id`.
pub fn is_uuid_v4(s: &str) -> bool {
    matches!(Uuid::parse_str(s), Ok(u) if u.get_version_num() == 4)
}

#[cfg(test)]
#[path = "chunk_tests.rs"]
mod tests;
