// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker state machine.
//!
//! ```text
//! Spawned → Locking → Scanning → Diffing → Processing → Finalizing → Exited
//!                   ↘ LockDenied → Exited
//!                               ↘ Failed → Exited
//! ```
//!
//! Scanning through Finalizing live in the pipeline; this module owns
//! the lock edges and the mapping of run faults onto terminal status.

use silo_core::config::Config;
use silo_core::error::{ErrorKind, Fault, ProcessingError, Stage};
use silo_core::event::{RunReport, TerminalStatus, WorkerEvent, WorkerStage};
use silo_core::retry::RetryPolicy;
use silo_engine::lock::{LockManager, LockStatus};
use silo_engine::{DirectoryPipeline, ErrorHandler};
use silo_remote::facade::VectorStore;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct WorkerContext {
    pub directory: PathBuf,
    pub config: Config,
    pub facade: Arc<dyn VectorStore>,
    pub cancel: CancellationToken,
    pub events: mpsc::UnboundedSender<WorkerEvent>,
}

/// Run one directory end to end and emit the Terminal event. The
/// returned status maps onto the process exit code.
pub async fn run(ctx: WorkerContext) -> TerminalStatus {
    let mut report = RunReport::default();
    let status = run_inner(&ctx, &mut report).await;
    let _ = ctx.events.send(WorkerEvent::Terminal { status, report });
    info!(directory = %ctx.directory.display(), status = %status, "worker done");
    status
}

async fn run_inner(ctx: &WorkerContext, report: &mut RunReport) -> TerminalStatus {
    let _ = ctx.events.send(WorkerEvent::StageChanged { stage: WorkerStage::Locking });

    let manager = LockManager::new();
    let handler = ErrorHandler::new(
        RetryPolicy::from(&ctx.config.retry),
        &ctx.directory,
        ctx.cancel.clone(),
    );

    // Lock I/O faults retry; a live owner is a clean LockDenied exit.
    let dir = ctx.directory.clone();
    let lock_manager = manager.clone();
    let mut guard = match handler
        .run(Stage::Lock, None, move || {
            let dir = dir.clone();
            let manager = lock_manager.clone();
            async move { manager.acquire(&dir) }
        })
        .await
    {
        Ok(guard) => guard,
        Err(record) => {
            report.errors.push(record.clone());
            return match record.kind {
                ErrorKind::AlreadyLocked => {
                    info!(directory = %ctx.directory.display(), "directory already owned");
                    TerminalStatus::LockDenied
                }
                ErrorKind::Cancelled => TerminalStatus::Cancelled,
                _ => {
                    error!(error = %record, "could not take the directory lock");
                    TerminalStatus::Failed
                }
            };
        }
    };

    let pipeline = DirectoryPipeline::new(
        Arc::clone(&ctx.facade),
        ctx.config.clone(),
        ctx.cancel.clone(),
        ctx.events.clone(),
    );
    let outcome = pipeline.run(&ctx.directory, report).await;

    // Record the terminal state in the artifact for observers, then
    // release. Both are best-effort: the run result stands either way.
    let status = match &outcome {
        Ok(()) => {
            if let Err(e) = manager.mark(&mut guard, LockStatus::Completing) {
                warn!(error = %e, "could not mark lock completing");
            }
            TerminalStatus::Clean
        }
        Err(record) => {
            if let Err(e) = manager.mark(&mut guard, LockStatus::Failed) {
                warn!(error = %e, "could not mark lock failed");
            }
            report.errors.push(record.clone());
            match record.kind {
                ErrorKind::Cancelled => TerminalStatus::Cancelled,
                _ => {
                    error!(error = %record, "run failed");
                    TerminalStatus::Failed
                }
            }
        }
    };

    if let Err(e) = manager.release(guard) {
        // Ownership lost mid-run is a programming error on somebody's
        // part; surface it loudly but keep the run's own status.
        error!(error = %e, kind = %e.kind(), "lock release failed");
        report.errors.push(ProcessingError::from_fault(&e, Stage::Finalize).in_directory(&ctx.directory));
    }

    status
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
