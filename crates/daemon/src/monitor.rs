// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker monitoring: per-worker event pumps and the heartbeat watchdog.

use crate::lifecycle::DaemonCtx;
use crate::spawn::WorkerHandle;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use silo_core::clock::{Clock, SystemClock};
use silo_core::error::{ErrorKind, ProcessingError, Stage};
use silo_core::event::{MasterMsg, WorkerEvent};
use silo_engine::lock::LockManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Own one worker from spawn to reap: pump its events into the fleet
/// table, forward control messages to its stdin, observe its exit, and
/// reclaim its lock if it died holding one.
pub async fn attach(
    ctx: Arc<DaemonCtx>,
    handle: WorkerHandle,
    mut control: mpsc::UnboundedReceiver<MasterMsg>,
) {
    let WorkerHandle { directory, mut child, mut stdin, stdout } = handle;

    // Control writer: forwards Cancel (and nothing else) to the worker.
    let control_dir = directory.clone();
    let writer = tokio::spawn(async move {
        while let Some(msg) = control.recv().await {
            if let Err(e) = silo_wire::write_msg(&mut stdin, &msg).await {
                debug!(directory = %control_dir.display(), error = %e, "control channel closed");
                return;
            }
        }
    });

    // Event pump: every message is a liveness signal.
    let mut events = BufReader::new(stdout);
    loop {
        match silo_wire::read_msg::<_, WorkerEvent>(&mut events).await {
            Ok(Some(event)) => {
                ctx.fleet.lock().apply_event(&directory, &event, SystemClock.epoch_ms());
            }
            Ok(None) => break,
            Err(e) => {
                warn!(directory = %directory.display(), error = %e, "worker event stream broken");
                break;
            }
        }
    }

    let exit_code = match child.wait().await {
        Ok(status) => status.code(),
        Err(e) => {
            error!(directory = %directory.display(), error = %e, "worker reap failed");
            None
        }
    };
    let pid = ctx.fleet.lock().record(&directory).and_then(|r| r.pid);
    ctx.fleet.lock().mark_exited(&directory, exit_code, SystemClock.epoch_ms());
    ctx.controls.lock().remove(&directory);
    writer.abort();

    // A worker that exited without releasing (crash, SIGKILL) leaves an
    // orphan we can identify by pid.
    if let Some(pid) = pid {
        match LockManager::new().reclaim_for_pid(&directory, pid as i32) {
            Ok(true) => {
                info!(directory = %directory.display(), pid, "reclaimed lock of dead worker");
            }
            Ok(false) => {}
            Err(e) => {
                warn!(directory = %directory.display(), error = %e, "post-exit lock reclaim failed");
            }
        }
    }

    info!(directory = %directory.display(), ?exit_code, "worker exited");
    ctx.kick.notify_one();
}

/// Kill workers that have gone silent past `heartbeat.timeout`, and
/// evict stale exited records while we are at it.
pub async fn watchdog_loop(ctx: Arc<DaemonCtx>) {
    let interval = Duration::from_secs(ctx.config.heartbeat.interval);
    let timeout_ms = ctx.config.heartbeat.timeout * 1000;
    let retention_ms = crate::env::exited_retention().as_millis() as u64;

    loop {
        tokio::select! {
            _ = ctx.shutdown.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }

        let now_ms = SystemClock.epoch_ms();
        let hung = {
            let mut fleet = ctx.fleet.lock();
            fleet.evict_exited(now_ms, retention_ms);
            fleet.hung_workers(now_ms, timeout_ms)
        };

        for (directory, pid) in hung {
            error!(
                directory = %directory.display(),
                pid,
                timeout_s = ctx.config.heartbeat.timeout,
                "worker heartbeat timed out; terminating"
            );
            {
                let mut fleet = ctx.fleet.lock();
                if let Some(record) = fleet.workers.get_mut(&directory) {
                    record.last_error = Some(
                        ProcessingError::new(
                            ErrorKind::HeartbeatTimeout,
                            Stage::Finalize,
                            format!("no message for over {}s", ctx.config.heartbeat.timeout),
                        )
                        .in_directory(&directory)
                        .at(now_ms),
                    );
                }
            }
            // SIGKILL; the attach task observes the exit, records it,
            // and reclaims the lock.
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGKILL);
        }
    }
}
