// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The fleet table: the master's view of every worker, plus the
//! admission queue and the reconciled watch set.
//!
//! All mutation happens under one coarse mutex held by the caller
//! (`DaemonCtx::fleet`); every method here is short and allocation-light.
//! Per-directory uniqueness is enforced at admission: a directory with
//! an active record is never queued or spawned twice.

use serde::{Deserialize, Serialize};
use silo_core::error::{ErrorKind, ProcessingError, Stage};
use silo_core::event::{FileOutcome, TerminalStatus, WorkerEvent, WorkerStage};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Pending,
    Starting,
    Running,
    Draining,
    Failed,
    Exited,
}

impl WorkerState {
    /// Active states hold the directory; a new worker may not start.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            WorkerState::Pending | WorkerState::Starting | WorkerState::Running | WorkerState::Draining
        )
    }

    /// States that count against `fleet.max_processes`.
    pub fn is_live(&self) -> bool {
        matches!(self, WorkerState::Starting | WorkerState::Running | WorkerState::Draining)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Pending => "pending",
            WorkerState::Starting => "starting",
            WorkerState::Running => "running",
            WorkerState::Draining => "draining",
            WorkerState::Failed => "failed",
            WorkerState::Exited => "exited",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub directory: PathBuf,
    pub pid: Option<u32>,
    pub state: WorkerState,
    pub stage: Option<WorkerStage>,
    pub started_at_ms: u64,
    pub last_heartbeat_ms: u64,
    pub files_seen: u64,
    pub files_processed: u64,
    pub files_failed: u64,
    pub files_skipped: u64,
    pub chunks_committed: u64,
    pub terminal: Option<TerminalStatus>,
    pub last_error: Option<ProcessingError>,
    pub exited_at_ms: Option<u64>,
}

impl WorkerRecord {
    fn new(directory: PathBuf, now_ms: u64) -> Self {
        Self {
            directory,
            pid: None,
            state: WorkerState::Pending,
            stage: None,
            started_at_ms: now_ms,
            last_heartbeat_ms: now_ms,
            files_seen: 0,
            files_processed: 0,
            files_failed: 0,
            files_skipped: 0,
            chunks_committed: 0,
            terminal: None,
            last_error: None,
            exited_at_ms: None,
        }
    }
}

/// Accumulated per-directory totals across runs, for
/// `get_processing_stats`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryTotals {
    pub runs: u64,
    pub files_processed: u64,
    pub files_failed: u64,
    pub files_skipped: u64,
    pub chunks_committed: u64,
    pub last_status: Option<TerminalStatus>,
    pub last_finished_ms: Option<u64>,
    pub last_error: Option<ProcessingError>,
}

#[derive(Debug, Default)]
pub struct FleetState {
    pub workers: BTreeMap<PathBuf, WorkerRecord>,
    queue: VecDeque<PathBuf>,
    watched: BTreeSet<PathBuf>,
    totals: BTreeMap<PathBuf, DirectoryTotals>,
}

impl FleetState {
    pub fn new(watched: impl IntoIterator<Item = PathBuf>) -> Self {
        Self { watched: watched.into_iter().collect(), ..Self::default() }
    }

    pub fn watched(&self) -> impl Iterator<Item = &PathBuf> {
        self.watched.iter()
    }

    pub fn is_watched(&self, dir: &Path) -> bool {
        self.watched.contains(dir)
    }

    pub fn watch(&mut self, dir: PathBuf) -> bool {
        self.watched.insert(dir)
    }

    pub fn unwatch(&mut self, dir: &Path) -> bool {
        self.queue.retain(|d| d != dir);
        self.watched.remove(dir)
    }

    pub fn live_count(&self) -> usize {
        self.workers.values().filter(|w| w.state.is_live()).count()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn queued(&self) -> Vec<PathBuf> {
        self.queue.iter().cloned().collect()
    }

    pub fn totals(&self) -> &BTreeMap<PathBuf, DirectoryTotals> {
        &self.totals
    }

    pub fn record(&self, dir: &Path) -> Option<&WorkerRecord> {
        self.workers.get(dir)
    }

    fn is_active(&self, dir: &Path) -> bool {
        self.queue.iter().any(|d| d == dir)
            || self.workers.get(dir).is_some_and(|w| w.state.is_active())
    }

    /// Queue `dir` for processing unless it is already active or was
    /// finished less than `cooldown_ms` ago. Returns whether it queued.
    pub fn admit(&mut self, dir: &Path, now_ms: u64, cooldown_ms: u64) -> bool {
        if !self.watched.contains(dir) || self.is_active(dir) {
            return false;
        }
        if let Some(record) = self.workers.get(dir) {
            if let Some(exited) = record.exited_at_ms {
                if now_ms.saturating_sub(exited) < cooldown_ms {
                    return false;
                }
            }
        }
        self.workers.insert(dir.to_path_buf(), WorkerRecord::new(dir.to_path_buf(), now_ms));
        self.queue.push_back(dir.to_path_buf());
        true
    }

    /// Force a directory to the queue regardless of cooldown (used by
    /// `start_watching`). Uniqueness still holds.
    pub fn admit_now(&mut self, dir: &Path, now_ms: u64) -> bool {
        self.admit(dir, now_ms, 0)
    }

    /// Pop the next directory if the fleet has a free slot.
    pub fn next_to_spawn(&mut self, max_processes: u32) -> Option<PathBuf> {
        if self.live_count() >= max_processes as usize {
            return None;
        }
        self.queue.pop_front()
    }

    pub fn mark_starting(&mut self, dir: &Path, pid: u32, now_ms: u64) {
        if let Some(record) = self.workers.get_mut(dir) {
            record.state = WorkerState::Starting;
            record.pid = Some(pid);
            record.started_at_ms = now_ms;
            record.last_heartbeat_ms = now_ms;
        }
    }

    pub fn mark_draining(&mut self, dir: &Path) {
        if let Some(record) = self.workers.get_mut(dir) {
            if record.state.is_live() {
                record.state = WorkerState::Draining;
            }
        }
    }

    pub fn mark_spawn_failed(&mut self, dir: &Path, error: ProcessingError, now_ms: u64) {
        if let Some(record) = self.workers.get_mut(dir) {
            record.state = WorkerState::Failed;
            record.last_error = Some(error);
            record.exited_at_ms = Some(now_ms);
        }
    }

    /// Fold one worker event into the record. Any message counts as a
    /// liveness signal.
    pub fn apply_event(&mut self, dir: &Path, event: &WorkerEvent, now_ms: u64) {
        let Some(record) = self.workers.get_mut(dir) else {
            return;
        };
        record.last_heartbeat_ms = now_ms;

        match event {
            WorkerEvent::Hello { pid, .. } => {
                record.pid = Some(*pid);
                if record.state == WorkerState::Starting {
                    record.state = WorkerState::Running;
                }
            }
            WorkerEvent::StageChanged { stage } => {
                record.stage = Some(*stage);
                if record.state == WorkerState::Starting {
                    record.state = WorkerState::Running;
                }
            }
            WorkerEvent::Progress { seen, processed, failed, skipped, .. } => {
                record.files_seen = (*seen).max(record.files_seen);
                record.files_processed = (*processed).max(record.files_processed);
                record.files_failed = (*failed).max(record.files_failed);
                record.files_skipped = (*skipped).max(record.files_skipped);
            }
            WorkerEvent::FileDone { outcome, chunks, error, .. } => {
                match outcome {
                    FileOutcome::Committed => {
                        record.files_processed += 1;
                        record.chunks_committed += chunks;
                    }
                    FileOutcome::Failed => record.files_failed += 1,
                    _ => record.files_skipped += 1,
                }
                if let Some(error) = error {
                    record.last_error = Some(error.clone());
                }
            }
            WorkerEvent::Warning { error } => {
                record.last_error = Some(error.clone());
            }
            WorkerEvent::Heartbeat { .. } => {}
            WorkerEvent::Terminal { status, report } => {
                record.terminal = Some(*status);
                record.files_seen = report.files_seen.max(record.files_seen);
                record.files_processed = report.files_processed;
                record.files_failed = report.files_failed;
                record.files_skipped = report.files_skipped;
                record.chunks_committed = report.chunks_committed;
                if let Some(error) = report.errors.last() {
                    record.last_error = Some(error.clone());
                }

                let totals = self.totals.entry(dir.to_path_buf()).or_default();
                totals.runs += 1;
                totals.files_processed += report.files_processed;
                totals.files_failed += report.files_failed;
                totals.files_skipped += report.files_skipped;
                totals.chunks_committed += report.chunks_committed;
                totals.last_status = Some(*status);
                totals.last_finished_ms = Some(now_ms);
                totals.last_error = report.errors.last().cloned();
            }
        }
    }

    /// OS-level exit observed. The exit code is authoritative when no
    /// Terminal event arrived (crashed or killed worker).
    pub fn mark_exited(&mut self, dir: &Path, exit_code: Option<i32>, now_ms: u64) {
        let Some(record) = self.workers.get_mut(dir) else {
            return;
        };
        record.exited_at_ms = Some(now_ms);
        let status = record
            .terminal
            .or_else(|| exit_code.and_then(TerminalStatus::from_exit_code));
        record.terminal = status;
        record.state = match status {
            Some(TerminalStatus::Failed) | None => WorkerState::Failed,
            Some(_) => WorkerState::Exited,
        };
        if status.is_none() {
            record.last_error = Some(
                ProcessingError::new(
                    ErrorKind::HeartbeatTimeout,
                    Stage::Finalize,
                    match exit_code {
                        Some(code) => format!("worker died with unexpected exit code {code}"),
                        None => "worker killed".to_string(),
                    },
                )
                .in_directory(dir),
            );
        }
    }

    /// Workers whose last message is older than the heartbeat timeout.
    pub fn hung_workers(&self, now_ms: u64, timeout_ms: u64) -> Vec<(PathBuf, u32)> {
        self.workers
            .values()
            .filter(|w| w.state.is_live())
            .filter(|w| now_ms.saturating_sub(w.last_heartbeat_ms) >= timeout_ms)
            .filter_map(|w| w.pid.map(|pid| (w.directory.clone(), pid)))
            .collect()
    }

    /// Drop exited records past their retention window.
    pub fn evict_exited(&mut self, now_ms: u64, retention_ms: u64) {
        self.workers.retain(|_, w| match (w.state.is_active(), w.exited_at_ms) {
            (true, _) => true,
            (false, Some(exited)) => now_ms.saturating_sub(exited) < retention_ms,
            (false, None) => true,
        });
    }

    pub fn count_in_state(&self, state: WorkerState) -> usize {
        self.workers.values().filter(|w| w.state == state).count()
    }
}

#[cfg(test)]
#[path = "fleet_tests.rs"]
mod tests;
