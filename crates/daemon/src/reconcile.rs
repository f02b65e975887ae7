// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission and reconciliation: keep the fleet aligned with the
//! watched-directory set, under the fleet cap, one worker per directory.
//!
//! Scheduling is static: a spawned worker owns its directory until it
//! exits. The loop only admits and fills free slots.

use crate::lifecycle::DaemonCtx;
use crate::{monitor, spawn};
use silo_core::clock::{Clock, SystemClock};
use silo_core::error::{ErrorKind, ProcessingError, Stage};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub async fn reconcile_loop(ctx: Arc<DaemonCtx>) {
    let interval = Duration::from_secs(ctx.config.watch.scan_interval);
    loop {
        run_once(&ctx).await;
        tokio::select! {
            _ = ctx.shutdown.cancelled() => return,
            _ = ctx.kick.notified() => {}
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

/// One reconcile round: admit idle watched directories, then spawn
/// while slots remain.
pub async fn run_once(ctx: &Arc<DaemonCtx>) {
    if ctx.shutdown.is_cancelled() {
        return;
    }
    let now_ms = SystemClock.epoch_ms();
    let cooldown_ms = ctx.config.watch.scan_interval * 1000;

    {
        let mut fleet = ctx.fleet.lock();
        let watched: Vec<PathBuf> = fleet.watched().cloned().collect();
        for dir in watched {
            if fleet.admit(&dir, now_ms, cooldown_ms) {
                info!(directory = %dir.display(), "admitted for processing");
            }
        }
    }

    loop {
        let next = ctx.fleet.lock().next_to_spawn(ctx.config.fleet.max_processes);
        let Some(dir) = next else {
            return;
        };

        match spawn::spawn_worker(&ctx.config, &dir).await {
            Ok(handle) => {
                let pid = handle.pid();
                ctx.fleet.lock().mark_starting(&dir, pid, SystemClock.epoch_ms());

                let (control_tx, control_rx) = mpsc::unbounded_channel();
                ctx.controls.lock().insert(dir.clone(), control_tx);
                tokio::spawn(monitor::attach(Arc::clone(ctx), handle, control_rx));
                info!(directory = %dir.display(), pid, "worker spawned");
            }
            Err(e) => {
                warn!(directory = %dir.display(), error = %e, "worker spawn failed");
                ctx.fleet.lock().mark_spawn_failed(
                    &dir,
                    ProcessingError::new(ErrorKind::ConfigInvalid, Stage::Lock, e.to_string())
                        .in_directory(&dir),
                    SystemClock.epoch_ms(),
                );
            }
        }
    }
}
