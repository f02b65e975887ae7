// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-process directory locking.
//!
//! The on-disk artifact `<dir>/.processing.lock` is the only shared
//! resource between processes; all synchronization happens through
//! exclusive creation of that file. In-process mutexes play no part in
//! cross-process correctness. A lock is valid only while its recorded pid
//! is alive; locks whose owner died are reclaimable by anyone.

use chrono::{DateTime, Utc};
use nix::sys::signal::kill;
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use silo_core::clock::{Clock, SystemClock};
use silo_core::error::{ErrorKind, Fault};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const LOCK_FILE_NAME: &str = ".processing.lock";

/// Grace before treating an unparseable artifact as corrupt: a creator
/// that just won the exclusive create may not have written its content
/// yet.
const CORRUPT_RECHECK: std::time::Duration = std::time::Duration::from_millis(25);

/// Lock lifecycle as recorded in the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockStatus {
    Active,
    Completing,
    Failed,
}

/// Wire format of the lock artifact. Field names and the ISO-8601
/// encoding are stable; unknown fields survive a rewrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockFile {
    pub process_id: i32,
    pub created_at: DateTime<Utc>,
    pub directory: PathBuf,
    pub status: LockStatus,
    pub lock_file_path: PathBuf,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LockFile {
    /// Advisory staleness for status displays. Liveness of the owning
    /// pid, not age, decides reclaim.
    pub fn is_stale(&self, now: DateTime<Utc>, timeout_secs: u64) -> bool {
        let age = now.signed_duration_since(self.created_at);
        age.num_seconds() >= 0 && age.num_seconds() as u64 >= timeout_secs
    }
}

/// Proof of ownership held by the worker for the lifetime of a run.
/// Released explicitly; a crash leaves an orphan for others to reclaim.
#[derive(Debug)]
pub struct LockGuard {
    lock: LockFile,
    path: PathBuf,
}

impl LockGuard {
    pub fn directory(&self) -> &Path {
        &self.lock.directory
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_file(&self) -> &LockFile {
        &self.lock
    }
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error("directory {dir} is locked by live process {pid}")]
    AlreadyLocked { dir: PathBuf, pid: i32 },

    #[error("lock on {dir} is owned by pid {owner}, not {caller}")]
    NotOwner { dir: PathBuf, owner: i32, caller: i32 },

    #[error("lock file {path} is unreadable: {detail}")]
    Corrupt { path: PathBuf, detail: String },

    #[error("lock I/O on {path} failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Fault for LockError {
    fn kind(&self) -> ErrorKind {
        match self {
            LockError::AlreadyLocked { .. } => ErrorKind::AlreadyLocked,
            LockError::NotOwner { .. } => ErrorKind::NotOwner,
            LockError::Corrupt { .. } | LockError::Io { .. } => ErrorKind::LockIo,
        }
    }
}

enum ReadOutcome {
    Parsed(LockFile),
    Gone,
    Corrupt(String),
}

#[derive(Debug, Clone)]
pub struct LockManager<C: Clock = SystemClock> {
    clock: C,
}

impl LockManager<SystemClock> {
    pub fn new() -> Self {
        Self { clock: SystemClock }
    }
}

impl Default for LockManager<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> LockManager<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    /// Take the lock on `dir`.
    ///
    /// Reclaims at most once for a corrupt artifact and at most once for
    /// a dead owner; a creator racing in between wins and the call fails
    /// with `AlreadyLocked`.
    pub fn acquire(&self, dir: &Path) -> Result<LockGuard, LockError> {
        let path = dir.join(LOCK_FILE_NAME);
        let mut reclaimed_corrupt = false;
        let mut reclaimed_dead = false;
        let mut last_pid = 0;

        for _ in 0..4 {
            if let Some(guard) = self.try_create(&path, dir)? {
                return Ok(guard);
            }

            match read_lock(&path)? {
                ReadOutcome::Gone => continue,
                ReadOutcome::Corrupt(_) => {
                    // An in-flight creator looks corrupt for an instant;
                    // re-read before reclaiming.
                    std::thread::sleep(CORRUPT_RECHECK);
                    let ReadOutcome::Corrupt(detail) = read_lock(&path)? else {
                        continue;
                    };
                    if reclaimed_corrupt {
                        return Err(LockError::Corrupt { path, detail });
                    }
                    warn!(path = %path.display(), %detail, "reclaiming corrupt lock");
                    reclaimed_corrupt = true;
                    remove_lock(&path)?;
                }
                ReadOutcome::Parsed(lock) => {
                    last_pid = lock.process_id;
                    if pid_alive(lock.process_id) {
                        return Err(LockError::AlreadyLocked { dir: dir.to_path_buf(), pid: lock.process_id });
                    }
                    if reclaimed_dead {
                        return Err(LockError::AlreadyLocked { dir: dir.to_path_buf(), pid: lock.process_id });
                    }
                    debug!(path = %path.display(), pid = lock.process_id, "reclaiming orphan lock");
                    reclaimed_dead = true;
                    remove_lock(&path)?;
                }
            }
        }

        Err(LockError::AlreadyLocked { dir: dir.to_path_buf(), pid: last_pid })
    }

    /// Release a lock this process owns. Verifies ownership against the
    /// artifact on disk and refuses to delete anything it does not own.
    pub fn release(&self, guard: LockGuard) -> Result<(), LockError> {
        let caller = std::process::id() as i32;
        match read_lock(&guard.path)? {
            ReadOutcome::Parsed(lock) if lock.process_id == caller => remove_lock(&guard.path),
            ReadOutcome::Parsed(lock) => Err(LockError::NotOwner {
                dir: guard.lock.directory.clone(),
                owner: lock.process_id,
                caller,
            }),
            // Someone reclaimed it out from under us; still not ours.
            ReadOutcome::Gone => {
                Err(LockError::NotOwner { dir: guard.lock.directory.clone(), owner: 0, caller })
            }
            ReadOutcome::Corrupt(detail) => Err(LockError::Corrupt { path: guard.path.clone(), detail }),
        }
    }

    /// Read-only look at the lock state. Never modifies anything.
    pub fn inspect(&self, dir: &Path) -> Result<Option<LockFile>, LockError> {
        let path = dir.join(LOCK_FILE_NAME);
        match read_lock(&path)? {
            ReadOutcome::Parsed(lock) => Ok(Some(lock)),
            ReadOutcome::Gone => Ok(None),
            ReadOutcome::Corrupt(detail) => Err(LockError::Corrupt { path, detail }),
        }
    }

    /// Remove the lock on `dir` if its owner is dead or the artifact is
    /// unparseable. Returns whether anything was removed.
    pub fn reclaim_orphan(&self, dir: &Path) -> Result<bool, LockError> {
        let path = dir.join(LOCK_FILE_NAME);
        match read_lock(&path)? {
            ReadOutcome::Gone => Ok(false),
            ReadOutcome::Corrupt(_) => {
                std::thread::sleep(CORRUPT_RECHECK);
                let ReadOutcome::Corrupt(detail) = read_lock(&path)? else {
                    return Ok(false);
                };
                warn!(path = %path.display(), %detail, "sweeping corrupt lock");
                remove_lock(&path)?;
                Ok(true)
            }
            ReadOutcome::Parsed(lock) if pid_alive(lock.process_id) => Ok(false),
            ReadOutcome::Parsed(lock) => {
                debug!(path = %path.display(), pid = lock.process_id, "sweeping orphan lock");
                remove_lock(&path)?;
                Ok(true)
            }
        }
    }

    /// Remove the lock on `dir` if it names `pid`. Used by the master
    /// after force-terminating (and reaping) a worker, where the dead
    /// child is known and liveness probes are moot.
    pub fn reclaim_for_pid(&self, dir: &Path, pid: i32) -> Result<bool, LockError> {
        let path = dir.join(LOCK_FILE_NAME);
        match read_lock(&path)? {
            ReadOutcome::Parsed(lock) if lock.process_id == pid => {
                remove_lock(&path)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Rewrite the artifact with a new status, preserving unknown fields.
    pub fn mark(&self, guard: &mut LockGuard, status: LockStatus) -> Result<(), LockError> {
        guard.lock.status = status;
        let body = serde_json::to_vec(&guard.lock)
            .map_err(|e| LockError::Corrupt { path: guard.path.clone(), detail: e.to_string() })?;
        std::fs::write(&guard.path, body)
            .map_err(|source| LockError::Io { path: guard.path.clone(), source })
    }

    fn try_create(&self, path: &Path, dir: &Path) -> Result<Option<LockGuard>, LockError> {
        let mut file = match std::fs::OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(None),
            Err(source) => return Err(LockError::Io { path: path.to_path_buf(), source }),
        };

        let lock = LockFile {
            process_id: std::process::id() as i32,
            created_at: self.clock.utc(),
            directory: dir.to_path_buf(),
            status: LockStatus::Active,
            lock_file_path: path.to_path_buf(),
            extra: serde_json::Map::new(),
        };
        let body = serde_json::to_vec(&lock)
            .map_err(|e| LockError::Corrupt { path: path.to_path_buf(), detail: e.to_string() })?;
        file.write_all(&body)
            .and_then(|_| file.flush())
            .map_err(|source| LockError::Io { path: path.to_path_buf(), source })?;

        Ok(Some(LockGuard { lock, path: path.to_path_buf() }))
    }
}

fn read_lock(path: &Path) -> Result<ReadOutcome, LockError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ReadOutcome::Gone),
        Err(source) => return Err(LockError::Io { path: path.to_path_buf(), source }),
    };
    match serde_json::from_str::<LockFile>(&content) {
        Ok(lock) => Ok(ReadOutcome::Parsed(lock)),
        Err(e) => Ok(ReadOutcome::Corrupt(e.to_string())),
    }
}

fn remove_lock(path: &Path) -> Result<(), LockError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LockError::Io { path: path.to_path_buf(), source }),
    }
}

/// A pid is alive if it exists and we may signal it. EPERM means it
/// exists under another user: conservatively alive, never reclaimed.
pub fn pid_alive(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::EPERM) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        Err(_) => true,
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
