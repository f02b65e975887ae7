// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use uuid::Uuid;

fn v4() -> String {
    Uuid::new_v4().to_string()
}

#[test]
fn fresh_v4_ids_pass() {
    for _ in 0..16 {
        assert!(is_uuid_v4(&v4()));
    }
}

#[yare::parameterized(
    empty     = { "" },
    garbage   = { "not-a-uuid" },
    nil       = { "00000000-0000-0000-0000-000000000000" },
    v1        = { "5be0ad26-7f50-11ee-b962-0242ac120002" },
    truncated = { "5be0ad26-7f50-41ee-b962" },
)]
fn non_v4_ids_fail(candidate: &str) {
    assert!(!is_uuid_v4(candidate));
}

#[test]
fn validate_accepts_well_formed_chunk() {
    let id = v4();
    let chunk = Chunk::new("some text", &id, "/docs/a.md");
    assert_eq!(chunk.validate(&id), Ok(()));
}

#[test]
fn validate_rejects_empty_body() {
    let id = v4();
    let chunk = Chunk::new("", &id, "/docs/a.md");
    assert!(matches!(chunk.validate(&id), Err(ChunkInvalid::EmptyBody { .. })));
}

#[test]
fn validate_rejects_foreign_source_id() {
    let id = v4();
    let chunk = Chunk::new("text", v4(), "/docs/a.md");
    assert!(matches!(chunk.validate(&id), Err(ChunkInvalid::SourceIdMismatch { .. })));
}

#[test]
fn status_serializes_uppercase() {
    let chunk = Chunk::new("text", v4(), "/docs/a.md");
    let json = serde_json::to_value(&chunk).unwrap();
    assert_eq!(json["status"], "NEW");
    assert!(json.get("metadata").is_none(), "empty metadata must be omitted");
}

#[test]
fn metadata_roundtrips() {
    let id = v4();
    let mut chunk = Chunk::new("text", &id, "/docs/a.md");
    chunk.metadata.insert("block_kind".into(), serde_json::json!("heading"));
    chunk.metadata.insert("ordinal".into(), serde_json::json!(3));

    let json = serde_json::to_string(&chunk).unwrap();
    let parsed: Chunk = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, chunk);
}
