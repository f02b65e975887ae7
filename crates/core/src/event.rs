// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Messages exchanged between the master and its workers.
//!
//! Worker stdout carries [`WorkerEvent`]s, worker stdin carries
//! [`MasterMsg`]s; both are framed by `silo-wire`.

use crate::config::Config;
use crate::error::ProcessingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// IPC protocol version. Master and worker refuse to talk across a skew.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Non-terminal stages of the worker state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStage {
    Locking,
    Scanning,
    Diffing,
    Processing,
    Finalizing,
}

impl fmt::Display for WorkerStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerStage::Locking => "locking",
            WorkerStage::Scanning => "scanning",
            WorkerStage::Diffing => "diffing",
            WorkerStage::Processing => "processing",
            WorkerStage::Finalizing => "finalizing",
        };
        f.write_str(name)
    }
}

/// Terminal status of one worker run, mapped onto the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Clean,
    LockDenied,
    Failed,
    Cancelled,
}

impl TerminalStatus {
    pub fn exit_code(&self) -> i32 {
        match self {
            TerminalStatus::Clean => 0,
            TerminalStatus::LockDenied => 1,
            TerminalStatus::Failed => 2,
            TerminalStatus::Cancelled => 3,
        }
    }

    pub fn from_exit_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(TerminalStatus::Clean),
            1 => Some(TerminalStatus::LockDenied),
            2 => Some(TerminalStatus::Failed),
            3 => Some(TerminalStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TerminalStatus::Clean => "clean",
            TerminalStatus::LockDenied => "lock_denied",
            TerminalStatus::Failed => "failed",
            TerminalStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Per-file decision reported in `FileDone` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileOutcome {
    Committed,
    #[serde(rename = "Skipped-Empty")]
    SkippedEmpty,
    #[serde(rename = "Skipped-TooLarge")]
    SkippedTooLarge,
    #[serde(rename = "Skipped-Unchanged")]
    SkippedUnchanged,
    Failed,
}

/// Aggregate totals for one directory run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub files_seen: u64,
    pub files_processed: u64,
    pub files_failed: u64,
    pub files_skipped: u64,
    pub chunks_committed: u64,
    pub duration_ms: u64,
    /// Final (post-retry) failure records, in occurrence order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ProcessingError>,
}

impl RunReport {
    pub fn record_outcome(&mut self, outcome: FileOutcome, chunks: u64) {
        match outcome {
            FileOutcome::Committed => {
                self.files_processed += 1;
                self.chunks_committed += chunks;
            }
            FileOutcome::Failed => self.files_failed += 1,
            _ => self.files_skipped += 1,
        }
    }
}

/// Event streamed from worker to master.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerEvent {
    /// First message on stdout; master refuses mismatched versions.
    Hello { pid: u32, directory: PathBuf, version: String },
    StageChanged { stage: WorkerStage },
    Progress {
        seen: u64,
        processed: u64,
        failed: u64,
        skipped: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current: Option<PathBuf>,
    },
    FileDone {
        file: PathBuf,
        outcome: FileOutcome,
        chunks: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ProcessingError>,
    },
    /// Non-fatal fault worth surfacing (unreadable entry, lossy decode).
    Warning { error: ProcessingError },
    Heartbeat { at_ms: u64 },
    /// Last message before exit.
    Terminal { status: TerminalStatus, report: RunReport },
}

/// Control message from master to worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MasterMsg {
    /// Handshake carrying the configuration snapshot; always first.
    Hello { version: String, directory: PathBuf, config: Config },
    /// Cooperative stop: finish or compensate the current file, release
    /// the lock, exit `Cancelled`.
    Cancel,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
