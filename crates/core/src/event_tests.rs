// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::{ErrorKind, Stage};
use std::path::PathBuf;

#[yare::parameterized(
    clean       = { TerminalStatus::Clean, 0 },
    lock_denied = { TerminalStatus::LockDenied, 1 },
    failed      = { TerminalStatus::Failed, 2 },
    cancelled   = { TerminalStatus::Cancelled, 3 },
)]
fn exit_codes_roundtrip(status: TerminalStatus, code: i32) {
    assert_eq!(status.exit_code(), code);
    assert_eq!(TerminalStatus::from_exit_code(code), Some(status));
}

#[test]
fn unknown_exit_code_has_no_status() {
    assert_eq!(TerminalStatus::from_exit_code(42), None);
}

#[yare::parameterized(
    empty     = { FileOutcome::SkippedEmpty, "\"Skipped-Empty\"" },
    too_large = { FileOutcome::SkippedTooLarge, "\"Skipped-TooLarge\"" },
    unchanged = { FileOutcome::SkippedUnchanged, "\"Skipped-Unchanged\"" },
    committed = { FileOutcome::Committed, "\"Committed\"" },
)]
fn outcome_wire_names(outcome: FileOutcome, expected: &str) {
    assert_eq!(serde_json::to_string(&outcome).unwrap(), expected);
}

#[test]
fn report_counters_follow_outcomes() {
    let mut report = RunReport::default();
    report.record_outcome(FileOutcome::Committed, 5);
    report.record_outcome(FileOutcome::SkippedEmpty, 0);
    report.record_outcome(FileOutcome::SkippedUnchanged, 0);
    report.record_outcome(FileOutcome::Failed, 0);

    assert_eq!(report.files_processed, 1);
    assert_eq!(report.files_skipped, 2);
    assert_eq!(report.files_failed, 1);
    assert_eq!(report.chunks_committed, 5);
}

#[test]
fn worker_event_is_tagged_by_type() {
    let event = WorkerEvent::FileDone {
        file: PathBuf::from("/docs/a.md"),
        outcome: FileOutcome::Failed,
        chunks: 0,
        error: Some(ProcessingError::new(ErrorKind::UpstreamUnavailable, Stage::Commit, "503")),
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "file_done");
    assert_eq!(json["outcome"], "Failed");

    let parsed: WorkerEvent = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, event);
}

#[test]
fn master_hello_carries_config_snapshot() {
    let msg = MasterMsg::Hello {
        version: PROTOCOL_VERSION.to_string(),
        directory: PathBuf::from("/tmp/docs"),
        config: Config::default(),
    };
    let json = serde_json::to_string(&msg).unwrap();
    let parsed: MasterMsg = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, msg);
}
