// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory scanning: one deterministic depth-first walk producing the
//! candidate FileRecords for a run.
//!
//! Entries within a directory are visited in ascending, case-sensitive
//! name order so runs (and test output) are reproducible. Per-entry
//! faults are counted and surfaced as warnings; only a failure to open
//! the root aborts the scan.

use globset::{Glob, GlobSet, GlobSetBuilder};
use silo_core::config::WatchConfig;
use silo_core::error::{ErrorKind, Fault, ProcessingError, Stage};
use silo_core::file::{extension_of, FileRecord};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use crate::lock::LOCK_FILE_NAME;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub recursive: bool,
    /// Normalized: lowercase, leading dot.
    pub extensions: Vec<String>,
    pub max_file_size: u64,
    pub follow_symlinks: bool,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl ScanOptions {
    pub fn from_watch(watch: &WatchConfig) -> Self {
        Self {
            recursive: watch.recursive,
            extensions: watch.normalized_formats(),
            max_file_size: watch.max_file_size,
            follow_symlinks: false,
            include: watch.include.clone(),
            exclude: watch.exclude.clone(),
        }
    }
}

/// Scan progress, reported to an optional observer as the walk proceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanProgress {
    pub seen: u64,
    pub accepted: u64,
}

#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Candidates within the size bound, in walk order.
    pub files: Vec<FileRecord>,
    /// Matched files exceeding `max_file_size`; reported downstream as
    /// Skipped-TooLarge without being parsed.
    pub oversize: Vec<FileRecord>,
    /// Files considered (post directory filtering, pre predicate).
    pub seen: u64,
    pub unreadable: u64,
    pub filtered: u64,
    pub warnings: Vec<ProcessingError>,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("directory {dir} unavailable: {source}")]
    Unavailable {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bad path pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("scan cancelled")]
    Cancelled,
}

impl Fault for ScanError {
    fn kind(&self) -> ErrorKind {
        match self {
            ScanError::Unavailable { .. } => ErrorKind::DirectoryUnavailable,
            ScanError::Pattern { .. } => ErrorKind::ConfigInvalid,
            ScanError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

#[derive(Clone)]
pub struct Scanner {
    options: ScanOptions,
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl Scanner {
    pub fn new(options: ScanOptions) -> Result<Self, ScanError> {
        let include = compile_patterns(&options.include)?;
        let exclude = compile_patterns(&options.exclude)?;
        Ok(Self { options, include, exclude })
    }

    /// Walk `dir` and collect candidates. The observer, when present,
    /// sees (seen, accepted) counts as the walk proceeds; its absence
    /// changes nothing else.
    pub fn scan(
        &self,
        dir: &Path,
        cancel: &CancellationToken,
        observer: Option<&dyn Fn(ScanProgress)>,
    ) -> Result<ScanOutcome, ScanError> {
        // Root readability is the one fatal precondition.
        std::fs::read_dir(dir)
            .map_err(|source| ScanError::Unavailable { dir: dir.to_path_buf(), source })?;

        let max_depth = if self.options.recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(dir)
            .follow_links(self.options.follow_symlinks)
            .max_depth(max_depth)
            .sort_by_file_name();

        let mut outcome = ScanOutcome::default();
        for entry in walker {
            if cancel.is_cancelled() {
                return Err(ScanError::Cancelled);
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    outcome.unreadable += 1;
                    let mut record =
                        ProcessingError::new(ErrorKind::FileIo, Stage::Scan, e.to_string())
                            .in_directory(dir);
                    if let Some(path) = e.path() {
                        record = record.for_file(path);
                    }
                    outcome.warnings.push(record);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.file_name() == LOCK_FILE_NAME {
                continue;
            }

            outcome.seen += 1;
            let path = entry.path();
            if !self.matches(dir, path) {
                outcome.filtered += 1;
                continue;
            }

            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(e) => {
                    outcome.unreadable += 1;
                    outcome.warnings.push(
                        ProcessingError::new(ErrorKind::FileIo, Stage::Scan, e.to_string())
                            .in_directory(dir)
                            .for_file(path),
                    );
                    continue;
                }
            };

            let record = FileRecord::from_metadata(path, &meta);
            if record.size > self.options.max_file_size {
                outcome.oversize.push(record);
            } else {
                outcome.files.push(record);
            }

            if let Some(observer) = observer {
                observer(ScanProgress {
                    seen: outcome.seen,
                    accepted: (outcome.files.len() + outcome.oversize.len()) as u64,
                });
            }
        }

        Ok(outcome)
    }

    /// Extension, then include/exclude predicates, all on the path
    /// relative to the scan root.
    fn matches(&self, root: &Path, path: &Path) -> bool {
        if !self.options.extensions.iter().any(|e| *e == extension_of(path)) {
            return false;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(relative) {
                return false;
            }
        }
        if let Some(include) = &self.include {
            if !include.is_match(relative) {
                return false;
            }
        }
        true
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Option<GlobSet>, ScanError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|source| ScanError::Pattern { pattern: pattern.clone(), source })?;
        builder.add(glob);
    }
    let set = builder
        .build()
        .map_err(|source| ScanError::Pattern { pattern: patterns.join(","), source })?;
    Ok(Some(set))
}

#[cfg(test)]
#[path = "scan_tests.rs"]
mod tests;
