// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File identity records: what the scanner found on disk, and what the
//! vector store says it already knows.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// A file on disk the pipeline may process. Created by the scanner and
/// moved through the stages; never mutated after creation (the content
/// hash is filled in at most once, during diffing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path.
    pub path: PathBuf,
    /// Size in bytes at scan time.
    pub size: u64,
    /// Last-modified time, milliseconds since the Unix epoch.
    pub mtime_ms: u64,
    /// Lowercased extension including the leading dot, e.g. `.md`.
    pub extension: String,
    /// SHA-256 of the content, hex-encoded. Computed opportunistically.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl FileRecord {
    pub fn new(path: impl Into<PathBuf>, size: u64, mtime_ms: u64) -> Self {
        let path = path.into();
        let extension = extension_of(&path);
        Self { path, size, mtime_ms, extension, content_hash: None }
    }

    pub fn from_metadata(path: impl Into<PathBuf>, meta: &std::fs::Metadata) -> Self {
        let mtime_ms = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self::new(path, meta.len(), mtime_ms)
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = Some(hash.into());
        self
    }
}

/// Lowercased extension with the leading dot, or empty for none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// What the vector store already holds for one file. Materialized on
/// demand by the database view from `files.list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedFileRecord {
    pub path: PathBuf,
    pub indexed_at_ms: u64,
    /// Last-modified time the file had when it was indexed.
    pub mtime_ms: u64,
    pub chunk_count: u64,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
