// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-directory orchestrator: scan, diff against the store, then
//! push each file through parse → chunk → embed → commit.
//!
//! File-scope failures are absorbed here — the file is recorded Failed
//! and the run continues. Only worker-scope faults (root unavailable,
//! store unreachable during diffing, cancellation) surface as errors;
//! the worker maps them onto its terminal status.

use crate::chunker::{ChunkingManager, UpstreamAttempts};
use crate::handler::ErrorHandler;
use crate::hash;
use crate::parse;
use crate::scan::{ScanOptions, ScanProgress, Scanner};
use silo_core::config::Config;
use silo_core::error::{ErrorKind, ProcessingError, Stage};
use silo_core::event::{FileOutcome, RunReport, WorkerEvent, WorkerStage};
use silo_core::retry::RetryPolicy;
use silo_remote::facade::VectorStore;
use silo_remote::view::DatabaseView;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct DirectoryPipeline {
    facade: Arc<dyn VectorStore>,
    config: Config,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<WorkerEvent>,
}

impl DirectoryPipeline {
    pub fn new(
        facade: Arc<dyn VectorStore>,
        config: Config,
        cancel: CancellationToken,
        events: mpsc::UnboundedSender<WorkerEvent>,
    ) -> Self {
        Self { facade, config, cancel, events }
    }

    /// Run the full pipeline for `dir`, filling `report` as it goes so a
    /// terminated run still reports partial totals. `Ok` may still carry
    /// per-file failures in the report; `Err` is a run-terminating fault.
    pub async fn run(&self, dir: &Path, report: &mut RunReport) -> Result<(), ProcessingError> {
        let started = std::time::Instant::now();

        // Scan.
        self.stage(WorkerStage::Scanning);
        let scanned = self.scan_directory(dir).await?;
        report.files_seen = scanned.seen;
        for warning in &scanned.warnings {
            self.emit(WorkerEvent::Warning { error: warning.clone() });
        }

        // Diff.
        self.stage(WorkerStage::Diffing);
        let handler = ErrorHandler::new(
            RetryPolicy::from(&self.config.retry),
            dir,
            self.cancel.clone(),
        );
        let view = DatabaseView::new(Arc::clone(&self.facade));
        let snapshot = handler
            .run_capped(Stage::Diff, None, self.config.upstream.store.retries, || {
                view.snapshot(dir, &self.cancel)
            })
            .await?;
        info!(
            directory = %dir.display(),
            candidates = scanned.files.len(),
            indexed = snapshot.len(),
            "diffing against the store"
        );

        let mut todo = Vec::new();
        for mut file in scanned.files {
            match hash::sha256_file(&file.path) {
                Ok(digest) => file.content_hash = Some(digest),
                Err(e) => self.emit(WorkerEvent::Warning {
                    error: ProcessingError::new(ErrorKind::FileIo, Stage::Diff, e.to_string())
                        .in_directory(dir)
                        .for_file(&file.path),
                }),
            }
            if snapshot.needs_index(&file) {
                todo.push(file);
            } else {
                self.file_done(report, file.path, FileOutcome::SkippedUnchanged, 0, None);
            }
        }

        // Process.
        self.stage(WorkerStage::Processing);
        for file in scanned.oversize {
            self.file_done(report, file.path, FileOutcome::SkippedTooLarge, 0, None);
        }

        let chunker = ChunkingManager::new(
            Arc::clone(&self.facade),
            self.config.chunking.clone(),
            UpstreamAttempts {
                segmentation: self.config.upstream.segmentation.retries,
                embedding: self.config.upstream.embedding.retries,
                store: self.config.upstream.store.retries,
            },
        );

        let mut since_progress = 0u64;
        for file in todo {
            if self.cancel.is_cancelled() {
                return Err(ProcessingError::new(
                    ErrorKind::Cancelled,
                    Stage::Chunk,
                    "stop requested",
                )
                .in_directory(dir));
            }

            let parsed = {
                let path = file.path.clone();
                handler
                    .run(Stage::Parse, Some(&file.path), move || {
                        let path = path.clone();
                        async move { parse::parse_path(&path) }
                    })
                    .await
            };
            let parsed = match parsed {
                Ok(parsed) => parsed,
                Err(record) if record.kind == ErrorKind::Cancelled => return Err(record),
                Err(record) => {
                    self.file_done(report, file.path.clone(), FileOutcome::Failed, 0, Some(record));
                    continue;
                }
            };
            if parsed.lossy {
                self.emit(WorkerEvent::Warning {
                    error: ProcessingError::new(
                        ErrorKind::Parse,
                        Stage::Parse,
                        "content was not valid UTF-8; decoded lossily",
                    )
                    .in_directory(dir)
                    .for_file(&file.path),
                });
            }

            match chunker.process_file(&file, parsed.blocks, &handler, &self.cancel).await {
                Ok(commit) => {
                    self.file_done(report, file.path.clone(), commit.outcome, commit.chunks, None);
                }
                Err(record) if record.kind == ErrorKind::Cancelled => {
                    self.file_done(
                        report,
                        file.path.clone(),
                        FileOutcome::Failed,
                        0,
                        Some(record.clone()),
                    );
                    return Err(record);
                }
                Err(record) => {
                    self.file_done(report, file.path.clone(), FileOutcome::Failed, 0, Some(record));
                }
            }

            since_progress += 1;
            if since_progress >= self.config.watch.progress_every {
                since_progress = 0;
                self.progress(report, Some(file.path));
            }
        }

        self.stage(WorkerStage::Finalizing);
        self.progress(report, None);
        report.duration_ms = started.elapsed().as_millis() as u64;
        Ok(())
    }

    async fn scan_directory(&self, dir: &Path) -> Result<crate::scan::ScanOutcome, ProcessingError> {
        let scanner = Scanner::new(ScanOptions::from_watch(&self.config.watch))
            .map_err(|e| ProcessingError::from_fault(&e, Stage::Scan).in_directory(dir))?;

        let dir_owned = dir.to_path_buf();
        let cancel = self.cancel.clone();
        let events = self.events.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let observer = move |progress: ScanProgress| {
                if progress.seen % 100 == 0 {
                    let _ = events.send(WorkerEvent::Progress {
                        seen: progress.seen,
                        processed: 0,
                        failed: 0,
                        skipped: 0,
                        current: None,
                    });
                }
            };
            scanner.scan(&dir_owned, &cancel, Some(&observer))
        })
        .await;

        match joined {
            Ok(result) => {
                result.map_err(|e| ProcessingError::from_fault(&e, Stage::Scan).in_directory(dir))
            }
            Err(join) => Err(ProcessingError::new(
                ErrorKind::DirectoryUnavailable,
                Stage::Scan,
                format!("scan task failed: {join}"),
            )
            .in_directory(dir)),
        }
    }

    fn file_done(
        &self,
        report: &mut RunReport,
        file: PathBuf,
        outcome: FileOutcome,
        chunks: u64,
        error: Option<ProcessingError>,
    ) {
        report.record_outcome(outcome, chunks);
        if let Some(error) = &error {
            report.errors.push(error.clone());
        }
        self.emit(WorkerEvent::FileDone { file, outcome, chunks, error });
    }

    fn progress(&self, report: &RunReport, current: Option<PathBuf>) {
        self.emit(WorkerEvent::Progress {
            seen: report.files_seen,
            processed: report.files_processed,
            failed: report.files_failed,
            skipped: report.files_skipped,
            current,
        });
    }

    fn stage(&self, stage: WorkerStage) {
        self.emit(WorkerEvent::StageChanged { stage });
    }

    fn emit(&self, event: WorkerEvent) {
        // A torn-down receiver means the worker is already exiting; the
        // pipeline result still travels back through the return value.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
