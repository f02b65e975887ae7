// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Projections of master state for the command surface. Thin and
//! read-only; nothing here touches the hot path.

use crate::fleet::{DirectoryTotals, FleetState, WorkerState};
use serde::{Deserialize, Serialize};
use silo_core::error::ProcessingError;
use silo_core::event::{TerminalStatus, WorkerStage};
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStats {
    pub version: String,
    pub uptime_s: u64,
    pub watched_directories: usize,
    pub queue_length: usize,
    pub fleet_max: u32,
    pub workers: WorkerCounts,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WorkerCounts {
    pub pending: usize,
    pub starting: usize,
    pub running: usize,
    pub draining: usize,
    pub failed: usize,
    pub exited: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub directories: Vec<DirectoryStats>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DirectoryStats {
    pub directory: PathBuf,
    pub runs: u64,
    pub files_processed: u64,
    pub files_failed: u64,
    pub files_skipped: u64,
    pub chunks_committed: u64,
    pub last_status: Option<TerminalStatus>,
    pub last_finished_ms: Option<u64>,
    pub last_error: Option<ProcessingError>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueueStatus {
    pub queued: Vec<PathBuf>,
    pub live: Vec<LiveWorker>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LiveWorker {
    pub directory: PathBuf,
    pub pid: Option<u32>,
    pub state: WorkerState,
    pub stage: Option<WorkerStage>,
    pub files_processed: u64,
    pub files_failed: u64,
    pub files_skipped: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WatchStatus {
    pub directory: PathBuf,
    pub watched: bool,
    pub state: Option<WorkerState>,
    pub stage: Option<WorkerStage>,
    pub lock: Option<LockView>,
    pub totals: Option<DirectoryTotals>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LockView {
    pub pid: i32,
    pub created_at: String,
    pub status: String,
    /// Advisory only, per `lock.timeout`.
    pub stale: bool,
}

pub fn worker_counts(fleet: &FleetState) -> WorkerCounts {
    WorkerCounts {
        pending: fleet.count_in_state(WorkerState::Pending),
        starting: fleet.count_in_state(WorkerState::Starting),
        running: fleet.count_in_state(WorkerState::Running),
        draining: fleet.count_in_state(WorkerState::Draining),
        failed: fleet.count_in_state(WorkerState::Failed),
        exited: fleet.count_in_state(WorkerState::Exited),
    }
}

pub fn processing_stats(fleet: &FleetState) -> ProcessingStats {
    let directories = fleet
        .totals()
        .iter()
        .map(|(directory, totals)| DirectoryStats {
            directory: directory.clone(),
            runs: totals.runs,
            files_processed: totals.files_processed,
            files_failed: totals.files_failed,
            files_skipped: totals.files_skipped,
            chunks_committed: totals.chunks_committed,
            last_status: totals.last_status,
            last_finished_ms: totals.last_finished_ms,
            last_error: totals.last_error.clone(),
        })
        .collect();
    ProcessingStats { directories }
}

pub fn queue_status(fleet: &FleetState) -> QueueStatus {
    let live = fleet
        .workers
        .values()
        .filter(|w| w.state.is_live())
        .map(|w| LiveWorker {
            directory: w.directory.clone(),
            pid: w.pid,
            state: w.state,
            stage: w.stage,
            files_processed: w.files_processed,
            files_failed: w.files_failed,
            files_skipped: w.files_skipped,
        })
        .collect();
    QueueStatus { queued: fleet.queued(), live }
}
