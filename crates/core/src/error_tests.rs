// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    config_invalid        = { ErrorKind::ConfigInvalid, false },
    lock_io               = { ErrorKind::LockIo, true },
    already_locked        = { ErrorKind::AlreadyLocked, false },
    not_owner             = { ErrorKind::NotOwner, false },
    directory_unavailable = { ErrorKind::DirectoryUnavailable, false },
    file_io               = { ErrorKind::FileIo, true },
    parse                 = { ErrorKind::Parse, false },
    upstream_unavailable  = { ErrorKind::UpstreamUnavailable, true },
    upstream_protocol     = { ErrorKind::UpstreamProtocol, true },
    rejected              = { ErrorKind::Rejected, false },
    partial_failure       = { ErrorKind::PartialFailure, false },
    heartbeat_timeout     = { ErrorKind::HeartbeatTimeout, false },
    cancelled             = { ErrorKind::Cancelled, false },
)]
fn retryability_matches_policy_table(kind: ErrorKind, expected: bool) {
    assert_eq!(kind.is_retryable(), expected);
}

#[yare::parameterized(
    lock_io  = { ErrorKind::LockIo, "\"LockIOError\"" },
    file_io  = { ErrorKind::FileIo, "\"FileIOError\"" },
    parse    = { ErrorKind::Parse, "\"ParseError\"" },
    protocol = { ErrorKind::UpstreamProtocol, "\"UpstreamProtocolError\"" },
    rejected = { ErrorKind::Rejected, "\"Rejected\"" },
)]
fn kind_wire_names_are_stable(kind: ErrorKind, expected: &str) {
    assert_eq!(serde_json::to_string(&kind).unwrap(), expected);
    let parsed: ErrorKind = serde_json::from_str(expected).unwrap();
    assert_eq!(parsed, kind);
}

#[test]
fn display_matches_wire_name() {
    assert_eq!(ErrorKind::LockIo.to_string(), "LockIOError");
    assert_eq!(ErrorKind::UpstreamUnavailable.to_string(), "UpstreamUnavailable");
}

#[test]
fn record_builder_fills_context() {
    let record = ProcessingError::new(ErrorKind::Rejected, Stage::Commit, "413 too large")
        .in_directory("/tmp/docs")
        .for_file("/tmp/docs/a.md")
        .on_attempt(3)
        .at(1_700_000_000_000);

    assert_eq!(record.kind, ErrorKind::Rejected);
    assert!(!record.retryable);
    assert_eq!(record.attempt, 3);
    assert_eq!(record.file.as_deref(), Some(std::path::Path::new("/tmp/docs/a.md")));
    assert!(record.to_string().contains("Rejected in commit stage"));
}

#[test]
fn record_roundtrips_through_json() {
    let record = ProcessingError::new(ErrorKind::UpstreamUnavailable, Stage::Embed, "503");
    let json = serde_json::to_string(&record).unwrap();
    let parsed: ProcessingError = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, record);
}
