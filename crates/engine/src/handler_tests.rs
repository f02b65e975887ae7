// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use silo_core::error::{ErrorKind, Fault, ProcessingError, Stage};
use silo_core::retry::RetryPolicy;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
#[error("{detail}")]
struct TestFault {
    kind: ErrorKind,
    detail: String,
}

impl Fault for TestFault {
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

fn fault(kind: ErrorKind) -> TestFault {
    TestFault { kind, detail: "boom".to_string() }
}

fn handler(max_attempts: u32) -> ErrorHandler {
    let policy =
        RetryPolicy::new(Duration::from_millis(10), Duration::from_millis(100), max_attempts);
    ErrorHandler::new(policy, "/tmp/docs", CancellationToken::new())
}

#[tokio::test(start_paused = true)]
async fn success_passes_through() {
    let result: Result<u32, ProcessingError> =
        handler(3).run(Stage::Scan, None, || async { Ok::<_, TestFault>(42) }).await;
    assert_eq!(result.unwrap(), 42);
}

#[tokio::test(start_paused = true)]
async fn transient_fault_is_retried_to_success() {
    let calls = AtomicU32::new(0);
    let result = handler(5)
        .run(Stage::Commit, None, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(fault(ErrorKind::UpstreamUnavailable))
                } else {
                    Ok("committed")
                }
            }
        })
        .await;
    assert_eq!(result.unwrap(), "committed");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn transient_fault_exhausts_the_ceiling() {
    let calls = AtomicU32::new(0);
    let result: Result<(), _> = handler(3)
        .run(Stage::Commit, Some(Path::new("/tmp/docs/a.md")), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(fault(ErrorKind::UpstreamUnavailable)) }
        })
        .await;

    let record = result.unwrap_err();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(record.kind, ErrorKind::UpstreamUnavailable);
    assert_eq!(record.attempt, 3);
    assert_eq!(record.file.as_deref(), Some(Path::new("/tmp/docs/a.md")));
    assert_eq!(record.directory.as_deref(), Some(Path::new("/tmp/docs")));
}

#[tokio::test(start_paused = true)]
async fn permanent_fault_fails_on_first_attempt() {
    let calls = AtomicU32::new(0);
    let result: Result<(), _> = handler(5)
        .run(Stage::Parse, None, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(fault(ErrorKind::Parse)) }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.unwrap_err().kind, ErrorKind::Parse);
}

#[tokio::test(start_paused = true)]
async fn protocol_fault_is_retried_exactly_once() {
    let calls = AtomicU32::new(0);
    let result: Result<(), _> = handler(5)
        .run(Stage::Diff, None, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(fault(ErrorKind::UpstreamProtocol)) }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(result.unwrap_err().kind, ErrorKind::UpstreamProtocol);
}

#[tokio::test(start_paused = true)]
async fn capped_ceiling_overrides_the_policy() {
    let calls = AtomicU32::new(0);
    let result: Result<(), _> = handler(5)
        .run_capped(Stage::Commit, None, 2, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(fault(ErrorKind::UpstreamUnavailable)) }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(result.is_err());
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_the_backoff() {
    let policy = RetryPolicy::new(Duration::from_secs(3600), Duration::from_secs(3600), 5);
    let cancel = CancellationToken::new();
    let handler = ErrorHandler::new(policy, "/tmp/docs", cancel.clone());

    let worker = tokio::spawn(async move {
        handler
            .run(Stage::Commit, None, || async {
                Err::<(), _>(fault(ErrorKind::UpstreamUnavailable))
            })
            .await
    });

    // Let the first attempt fail and enter its hour-long backoff.
    tokio::time::sleep(Duration::from_millis(1)).await;
    cancel.cancel();

    let record = worker.await.unwrap().unwrap_err();
    assert_eq!(record.kind, ErrorKind::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn pre_cancelled_handler_never_calls_the_operation() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let handler = ErrorHandler::new(
        RetryPolicy::new(Duration::from_millis(1), Duration::from_millis(1), 3),
        "/tmp/docs",
        cancel,
    );

    let calls = AtomicU32::new(0);
    let result: Result<(), _> = handler
        .run(Stage::Scan, None, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<(), TestFault>(()) }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(result.unwrap_err().kind, ErrorKind::Cancelled);
}
