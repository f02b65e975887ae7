// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn indexed(path: &str, mtime_ms: u64, hash: Option<&str>) -> IndexedFileRecord {
    IndexedFileRecord {
        path: PathBuf::from(path),
        indexed_at_ms: 1_000,
        mtime_ms,
        chunk_count: 3,
        status: "INDEXED".to_string(),
        content_hash: hash.map(String::from),
    }
}

fn on_disk(path: &str, mtime_ms: u64, hash: Option<&str>) -> FileRecord {
    let mut record = FileRecord::new(path, 100, mtime_ms);
    record.content_hash = hash.map(String::from);
    record
}

#[test]
fn unknown_file_needs_indexing() {
    let snapshot = IndexSnapshot::from_records(vec![]);
    assert!(snapshot.needs_index(&on_disk("/d/a.md", 5, None)));
}

#[yare::parameterized(
    older_mtime = { 5, 10, false },
    same_mtime  = { 10, 10, false },
    newer_mtime = { 11, 10, true },
)]
fn without_hashes_mtime_decides(disk_mtime: u64, indexed_mtime: u64, expected: bool) {
    let snapshot = IndexSnapshot::from_records(vec![indexed("/d/a.md", indexed_mtime, None)]);
    assert_eq!(snapshot.needs_index(&on_disk("/d/a.md", disk_mtime, None)), expected);
}

#[test]
fn matching_hashes_skip_even_with_newer_mtime() {
    let snapshot = IndexSnapshot::from_records(vec![indexed("/d/a.md", 10, Some("abc"))]);
    assert!(!snapshot.needs_index(&on_disk("/d/a.md", 99, Some("abc"))));
}

#[test]
fn differing_hashes_reindex_even_with_same_mtime() {
    let snapshot = IndexSnapshot::from_records(vec![indexed("/d/a.md", 10, Some("abc"))]);
    assert!(snapshot.needs_index(&on_disk("/d/a.md", 10, Some("def"))));
}

#[yare::parameterized(
    only_disk_hash  = { Some("abc"), None },
    only_store_hash = { None, Some("abc") },
)]
fn one_sided_hash_falls_back_to_mtime(disk_hash: Option<&str>, store_hash: Option<&str>) {
    let snapshot = IndexSnapshot::from_records(vec![indexed("/d/a.md", 10, store_hash)]);
    assert!(snapshot.needs_index(&on_disk("/d/a.md", 11, disk_hash)));
    assert!(!snapshot.needs_index(&on_disk("/d/a.md", 10, disk_hash)));
}

#[test]
fn snapshot_indexes_by_path() {
    let snapshot = IndexSnapshot::from_records(vec![
        indexed("/d/a.md", 1, None),
        indexed("/d/b.md", 2, None),
    ]);
    assert_eq!(snapshot.len(), 2);
    assert!(!snapshot.is_empty());
    assert_eq!(snapshot.get(Path::new("/d/b.md")).map(|r| r.mtime_ms), Some(2));
    assert!(snapshot.get(Path::new("/d/c.md")).is_none());
}
