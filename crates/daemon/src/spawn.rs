// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker process spawning and the Hello handshake.

use silo_core::config::Config;
use silo_core::event::{MasterMsg, PROTOCOL_VERSION};
use silo_wire::FrameError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("cannot launch {bin}: {source}")]
    Launch {
        bin: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("worker spawned without piped stdio")]
    NoStdio,

    #[error("handshake failed: {0}")]
    Handshake(#[from] FrameError),
}

/// A freshly spawned worker with its stdio still attached. The monitor
/// takes ownership and splits it into the event pump and control writer.
pub struct WorkerHandle {
    pub directory: PathBuf,
    pub child: Child,
    pub stdin: ChildStdin,
    pub stdout: ChildStdout,
}

impl WorkerHandle {
    pub fn pid(&self) -> u32 {
        self.child.id().unwrap_or(0)
    }
}

/// Locate the worker binary: explicit override, then a sibling of the
/// running executable, then `$PATH`.
pub fn worker_binary() -> PathBuf {
    if let Some(bin) = crate::env::worker_bin() {
        return bin;
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("silo-worker");
            if sibling.exists() {
                return sibling;
            }
        }
    }
    PathBuf::from("silo-worker")
}

/// Spawn one worker for `dir` and complete the Hello handshake. The
/// worker's stderr is inherited so its logs land in the daemon's.
pub async fn spawn_worker(config: &Config, dir: &Path) -> Result<WorkerHandle, SpawnError> {
    let bin = worker_binary();
    let mut child = Command::new(&bin)
        .arg("--directory")
        .arg(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| SpawnError::Launch { bin: bin.clone(), source })?;

    let mut stdin = child.stdin.take().ok_or(SpawnError::NoStdio)?;
    let stdout = child.stdout.take().ok_or(SpawnError::NoStdio)?;

    let hello = MasterMsg::Hello {
        version: PROTOCOL_VERSION.to_string(),
        directory: dir.to_path_buf(),
        config: config.clone(),
    };
    silo_wire::write_msg(&mut stdin, &hello).await?;

    Ok(WorkerHandle { directory: dir.to_path_buf(), child, stdin, stdout })
}
