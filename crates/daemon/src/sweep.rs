// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic orphan-lock sweeps over the watched directories.
//!
//! Any lock whose owning pid is dead (or whose artifact is unreadable)
//! is reclaimed, so a crashed fleet never wedges a directory. Locks
//! held by our own live workers are naturally left alone — their
//! owners are alive.

use crate::lifecycle::DaemonCtx;
use silo_engine::lock::LockManager;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub async fn sweep_loop(ctx: Arc<DaemonCtx>) {
    let interval = Duration::from_secs(ctx.config.watch.scan_interval);
    loop {
        run_once(&ctx);
        tokio::select! {
            _ = ctx.shutdown.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

pub fn run_once(ctx: &DaemonCtx) {
    let watched: Vec<PathBuf> = ctx.fleet.lock().watched().cloned().collect();
    let manager = LockManager::new();
    for dir in watched {
        match manager.reclaim_orphan(&dir) {
            Ok(true) => info!(directory = %dir.display(), "swept orphan lock"),
            Ok(false) => {}
            Err(e) => warn!(directory = %dir.display(), error = %e, "orphan sweep failed"),
        }
    }
}
