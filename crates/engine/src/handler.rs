// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The error handler wrapping every pipeline stage.
//!
//! Classifies faults into the shared taxonomy, retries transient kinds
//! with capped exponential backoff and full jitter, and gives permanent
//! kinds straight back to the caller as structured records. One record
//! is emitted per attempt; the final record is the return value.

use silo_core::clock::{Clock, SystemClock};
use silo_core::error::{ErrorKind, Fault, ProcessingError, Stage};
use silo_core::retry::RetryPolicy;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Clone)]
pub struct ErrorHandler {
    policy: RetryPolicy,
    directory: PathBuf,
    cancel: CancellationToken,
}

impl ErrorHandler {
    pub fn new(policy: RetryPolicy, directory: impl Into<PathBuf>, cancel: CancellationToken) -> Self {
        Self { policy, directory: directory.into(), cancel }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `op` under the configured attempt ceiling.
    pub async fn run<T, E, F, Fut>(
        &self,
        stage: Stage,
        file: Option<&Path>,
        op: F,
    ) -> Result<T, ProcessingError>
    where
        E: Fault,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_capped(stage, file, self.policy.max_attempts, op).await
    }

    /// Run `op` with an explicit attempt ceiling (per-service `retries`
    /// overrides the global default for upstream calls).
    pub async fn run_capped<T, E, F, Fut>(
        &self,
        stage: Stage,
        file: Option<&Path>,
        max_attempts: u32,
        mut op: F,
    ) -> Result<T, ProcessingError>
    where
        E: Fault,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let policy = self.policy.clone().with_max_attempts(max_attempts);
        let mut attempt = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled(stage, file, attempt));
            }
            attempt += 1;

            let error = match op().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            let kind = error.kind();
            let mut record = ProcessingError::from_fault(&error, stage)
                .in_directory(&self.directory)
                .on_attempt(attempt)
                .at(SystemClock.epoch_ms());
            if let Some(file) = file {
                record = record.for_file(file);
            }

            if !policy.allows(kind, attempt) {
                warn!(
                    kind = %record.kind,
                    stage = %record.stage,
                    attempt,
                    cause = %record.cause,
                    "giving up"
                );
                return Err(record);
            }

            let delay = policy.jittered(attempt);
            record.backoff_ms = Some(delay.as_millis() as u64);
            warn!(
                kind = %record.kind,
                stage = %record.stage,
                attempt,
                backoff_ms = record.backoff_ms,
                cause = %record.cause,
                "retrying after backoff"
            );

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    return Err(self.cancelled(stage, file, attempt));
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn cancelled(&self, stage: Stage, file: Option<&Path>, attempt: u32) -> ProcessingError {
        let mut record = ProcessingError::new(ErrorKind::Cancelled, stage, "stop requested")
            .in_directory(&self.directory)
            .on_attempt(attempt.max(1))
            .at(SystemClock.epoch_ms());
        if let Some(file) = file {
            record = record.for_file(file);
        }
        record
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
