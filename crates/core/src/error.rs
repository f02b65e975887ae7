// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure taxonomy shared by every stage of the pipeline.
//!
//! Concrete error enums (lock, scan, parse, remote, ...) live next to the
//! code that raises them; each implements [`Fault`] so the error handler
//! can classify it into an [`ErrorKind`] and decide retry vs give-up.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Classified failure kind. The wire names are stable; they appear in
/// progress events, stats queries, and the structured log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ConfigInvalid,
    #[serde(rename = "LockIOError")]
    LockIo,
    AlreadyLocked,
    NotOwner,
    DirectoryUnavailable,
    #[serde(rename = "FileIOError")]
    FileIo,
    #[serde(rename = "ParseError")]
    Parse,
    UpstreamUnavailable,
    #[serde(rename = "UpstreamProtocolError")]
    UpstreamProtocol,
    Rejected,
    PartialFailure,
    HeartbeatTimeout,
    Cancelled,
}

impl ErrorKind {
    /// Transient kinds are retried with backoff; everything else is
    /// permanent at its scope.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::LockIo
                | ErrorKind::FileIo
                | ErrorKind::UpstreamUnavailable
                | ErrorKind::UpstreamProtocol
        )
    }

}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::LockIo => "LockIOError",
            ErrorKind::AlreadyLocked => "AlreadyLocked",
            ErrorKind::NotOwner => "NotOwner",
            ErrorKind::DirectoryUnavailable => "DirectoryUnavailable",
            ErrorKind::FileIo => "FileIOError",
            ErrorKind::Parse => "ParseError",
            ErrorKind::UpstreamUnavailable => "UpstreamUnavailable",
            ErrorKind::UpstreamProtocol => "UpstreamProtocolError",
            ErrorKind::Rejected => "Rejected",
            ErrorKind::PartialFailure => "PartialFailure",
            ErrorKind::HeartbeatTimeout => "HeartbeatTimeout",
            ErrorKind::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

/// Pipeline stage a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Lock,
    Scan,
    Diff,
    Parse,
    Chunk,
    Embed,
    Commit,
    Finalize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Lock => "lock",
            Stage::Scan => "scan",
            Stage::Diff => "diff",
            Stage::Parse => "parse",
            Stage::Chunk => "chunk",
            Stage::Embed => "embed",
            Stage::Commit => "commit",
            Stage::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

/// An error that knows its place in the taxonomy.
pub trait Fault: fmt::Display {
    fn kind(&self) -> ErrorKind;
}

/// Structured failure record. Created at the failure site, flows through
/// progress events, and surfaces in `get_processing_stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingError {
    pub kind: ErrorKind,
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// 1-based attempt number this record describes.
    pub attempt: u32,
    pub retryable: bool,
    /// Backoff the handler decided on before the next attempt, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_ms: Option<u64>,
    pub cause: String,
    pub at_ms: u64,
}

impl ProcessingError {
    pub fn new(kind: ErrorKind, stage: Stage, cause: impl Into<String>) -> Self {
        Self {
            kind,
            stage,
            directory: None,
            file: None,
            attempt: 1,
            retryable: kind.is_retryable(),
            backoff_ms: None,
            cause: cause.into(),
            at_ms: 0,
        }
    }

    pub fn from_fault<E: Fault>(err: &E, stage: Stage) -> Self {
        Self::new(err.kind(), stage, err.to_string())
    }

    pub fn in_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.directory = Some(dir.into());
        self
    }

    pub fn for_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn on_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    pub fn at(mut self, epoch_ms: u64) -> Self {
        self.at_ms = epoch_ms;
        self
    }
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {} stage: {}", self.kind, self.stage, self.cause)?;
        if let Some(file) = &self.file {
            write!(f, " ({})", file.display())?;
        }
        Ok(())
    }
}

impl std::error::Error for ProcessingError {}

impl Fault for ProcessingError {
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
