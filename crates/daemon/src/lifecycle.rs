// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup, shared context, and graceful drain.

use crate::fleet::FleetState;
use crate::{env, listener, monitor, reconcile, sweep};
use fs2::FileExt;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use silo_core::config::{Config, ConfigError};
use silo_core::event::MasterMsg;
use silo_engine::lock::LockManager;
use silo_remote::client::RemoteError;
use silo_remote::facade::{RemoteStore, VectorStore};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("cannot determine state directory (HOME unset)")]
    NoStateDir,

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("another silod instance holds {path}")]
    AlreadyRunning { path: PathBuf },

    #[error("cannot bind command surface on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("bad upstream endpoint: {0}")]
    Upstream(#[from] RemoteError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Shared daemon context. The fleet table sits behind one coarse lock;
/// every critical section is short.
pub struct DaemonCtx {
    pub config: Config,
    pub fleet: Mutex<FleetState>,
    /// Control channels for sending `Cancel` to running workers.
    pub controls: Mutex<HashMap<PathBuf, mpsc::UnboundedSender<MasterMsg>>>,
    pub facade: Arc<dyn VectorStore>,
    pub shutdown: CancellationToken,
    /// Wakes the reconcile loop early (worker exit, start_watching).
    pub kick: Notify,
    pub started: Instant,
}

impl DaemonCtx {
    /// Request a cooperative cancel of the worker owning `dir`.
    pub fn cancel_worker(&self, dir: &std::path::Path) -> bool {
        self.fleet.lock().mark_draining(dir);
        match self.controls.lock().get(dir) {
            Some(tx) => tx.send(MasterMsg::Cancel).is_ok(),
            None => false,
        }
    }
}

pub struct StartupResult {
    pub ctx: Arc<DaemonCtx>,
    pub rpc_listener: TcpListener,
    /// Held for the daemon's lifetime; dropping it releases the
    /// single-instance flock.
    pub instance_lock: std::fs::File,
}

/// Validate config, take the single-instance lock, bind the command
/// surface, and build the shared context.
pub async fn startup(config: Config) -> Result<StartupResult, LifecycleError> {
    config.validate()?;

    let state_dir = env::state_dir()?;
    std::fs::create_dir_all(&state_dir)?;
    std::fs::create_dir_all(state_dir.join("logs"))?;

    // Exclusive flock first. Open without truncating so a failed
    // attempt cannot wipe the running daemon's pid.
    let lock_path = state_dir.join("silod.lock");
    let mut instance_lock = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)?;
    instance_lock
        .try_lock_exclusive()
        .map_err(|_| LifecycleError::AlreadyRunning { path: lock_path.clone() })?;
    instance_lock.set_len(0)?;
    writeln!(instance_lock, "{}", std::process::id())?;

    let rpc_listener = TcpListener::bind(&config.rpc.listen)
        .await
        .map_err(|source| LifecycleError::Bind { addr: config.rpc.listen.clone(), source })?;

    let facade: Arc<dyn VectorStore> = Arc::new(RemoteStore::from_config(&config.upstream)?);
    let fleet = FleetState::new(config.watch.directories.iter().cloned());

    let ctx = Arc::new(DaemonCtx {
        config,
        fleet: Mutex::new(fleet),
        controls: Mutex::new(HashMap::new()),
        facade,
        shutdown: CancellationToken::new(),
        kick: Notify::new(),
        started: Instant::now(),
    });

    info!(state_dir = %state_dir.display(), "silod started");
    Ok(StartupResult { ctx, rpc_listener, instance_lock })
}

/// Run the control loops until shutdown, then drain.
pub async fn run(ctx: Arc<DaemonCtx>, rpc_listener: TcpListener) {
    let loops = [
        tokio::spawn(reconcile::reconcile_loop(Arc::clone(&ctx))),
        tokio::spawn(sweep::sweep_loop(Arc::clone(&ctx))),
        tokio::spawn(monitor::watchdog_loop(Arc::clone(&ctx))),
        tokio::spawn(listener::serve(Arc::clone(&ctx), rpc_listener)),
    ];

    ctx.shutdown.cancelled().await;
    drain(&ctx).await;

    for task in loops {
        task.abort();
    }
}

/// Graceful drain: stop admission (the loops observe `shutdown`), ask
/// every live worker to cancel, wait out the grace period, then
/// force-terminate survivors and reclaim their locks.
pub async fn drain(ctx: &DaemonCtx) {
    let live: Vec<PathBuf> = {
        let fleet = ctx.fleet.lock();
        fleet
            .workers
            .values()
            .filter(|w| w.state.is_live())
            .map(|w| w.directory.clone())
            .collect()
    };
    info!(workers = live.len(), "draining fleet");
    for dir in &live {
        ctx.cancel_worker(dir);
    }

    let deadline = Instant::now() + env::drain_timeout();
    while Instant::now() < deadline {
        if ctx.fleet.lock().live_count() == 0 {
            info!("fleet drained cleanly");
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let survivors: Vec<(PathBuf, u32)> = {
        let fleet = ctx.fleet.lock();
        fleet
            .workers
            .values()
            .filter(|w| w.state.is_live())
            .filter_map(|w| w.pid.map(|pid| (w.directory.clone(), pid)))
            .collect()
    };
    for (dir, pid) in &survivors {
        warn!(directory = %dir.display(), pid, "force-terminating worker");
        let _ = kill(Pid::from_raw(*pid as i32), Signal::SIGKILL);
    }

    // Give the monitor tasks a moment to reap and reclaim, then sweep
    // whatever is left ourselves.
    tokio::time::sleep(Duration::from_millis(500)).await;
    let manager = LockManager::new();
    for (dir, pid) in &survivors {
        match manager.reclaim_for_pid(dir, *pid as i32) {
            Ok(true) => info!(directory = %dir.display(), "reclaimed lock of killed worker"),
            Ok(false) => {}
            Err(e) => warn!(directory = %dir.display(), error = %e, "lock reclaim failed"),
        }
    }
}
