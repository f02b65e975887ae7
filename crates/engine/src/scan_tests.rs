// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use silo_core::error::{ErrorKind, Fault};
use std::fs;
use std::path::Path;

fn options() -> ScanOptions {
    ScanOptions {
        recursive: true,
        extensions: vec![".txt".to_string(), ".md".to_string()],
        max_file_size: 1024,
        follow_symlinks: false,
        include: Vec::new(),
        exclude: Vec::new(),
    }
}

fn touch(path: &Path, bytes: usize) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, vec![b'x'; bytes]).unwrap();
}

fn scan(dir: &Path, options: ScanOptions) -> ScanOutcome {
    let cancel = CancellationToken::new();
    Scanner::new(options).unwrap().scan(dir, &cancel, None).unwrap()
}

fn names(records: &[silo_core::file::FileRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn walk_is_depth_first_and_name_sorted() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("b.md"), 1);
    touch(&dir.path().join("a/z.txt"), 1);
    touch(&dir.path().join("a/a.txt"), 1);
    touch(&dir.path().join("c/only.md"), 1);

    let outcome = scan(dir.path(), options());
    assert_eq!(names(&outcome.files), vec!["a.txt", "z.txt", "b.md", "only.md"]);
}

#[test]
fn scan_order_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["d.md", "b.txt", "c.md", "a.txt"] {
        touch(&dir.path().join(name), 1);
    }
    let first = names(&scan(dir.path(), options()).files);
    let second = names(&scan(dir.path(), options()).files);
    assert_eq!(first, second);
    assert_eq!(first, vec!["a.txt", "b.txt", "c.md", "d.md"]);
}

#[test]
fn extension_filter_is_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("upper.MD"), 1);
    touch(&dir.path().join("lower.md"), 1);
    touch(&dir.path().join("binary.png"), 1);

    let outcome = scan(dir.path(), options());
    assert_eq!(names(&outcome.files), vec!["lower.md", "upper.MD"]);
    assert_eq!(outcome.filtered, 1);
    assert_eq!(outcome.seen, 3);
}

#[test]
fn non_recursive_stays_at_top_level() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("top.md"), 1);
    touch(&dir.path().join("nested/deep.md"), 1);

    let mut opts = options();
    opts.recursive = false;
    let outcome = scan(dir.path(), opts);
    assert_eq!(names(&outcome.files), vec!["top.md"]);
}

#[test]
fn oversize_files_are_segregated_not_dropped() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("small.txt"), 10);
    touch(&dir.path().join("big.txt"), 2048);

    let outcome = scan(dir.path(), options());
    assert_eq!(names(&outcome.files), vec!["small.txt"]);
    assert_eq!(names(&outcome.oversize), vec!["big.txt"]);
}

#[test]
fn lock_artifact_is_never_a_candidate() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("real.txt"), 1);
    // Even with a matching extension appended it is the exact name that
    // is skipped; the artifact itself has none.
    fs::write(dir.path().join(LOCK_FILE_NAME), b"{}").unwrap();

    let outcome = scan(dir.path(), options());
    assert_eq!(names(&outcome.files), vec!["real.txt"]);
    assert_eq!(outcome.seen, 1);
}

#[test]
fn exclude_patterns_win_over_include() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("keep/a.md"), 1);
    touch(&dir.path().join("drafts/b.md"), 1);

    let mut opts = options();
    opts.exclude = vec!["drafts/**".to_string()];
    let outcome = scan(dir.path(), opts);
    assert_eq!(names(&outcome.files), vec!["a.md"]);
    assert_eq!(outcome.filtered, 1);
}

#[test]
fn include_patterns_narrow_the_walk() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("notes/a.md"), 1);
    touch(&dir.path().join("other/b.md"), 1);

    let mut opts = options();
    opts.include = vec!["notes/**".to_string()];
    let outcome = scan(dir.path(), opts);
    assert_eq!(names(&outcome.files), vec!["a.md"]);
}

#[test]
fn bad_pattern_is_a_config_fault() {
    let mut opts = options();
    opts.exclude = vec!["[".to_string()];
    match Scanner::new(opts) {
        Err(e @ ScanError::Pattern { .. }) => assert_eq!(e.kind(), ErrorKind::ConfigInvalid),
        other => panic!("expected Pattern error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn missing_root_aborts_with_directory_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let gone = dir.path().join("nope");
    let cancel = CancellationToken::new();
    let result = Scanner::new(options()).unwrap().scan(&gone, &cancel, None);
    match result {
        Err(e @ ScanError::Unavailable { .. }) => {
            assert_eq!(e.kind(), ErrorKind::DirectoryUnavailable);
        }
        other => panic!("expected Unavailable, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn broken_symlink_is_counted_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("ok.md"), 1);
    std::os::unix::fs::symlink(dir.path().join("missing.md"), dir.path().join("dangling.md"))
        .unwrap();

    let mut opts = options();
    opts.follow_symlinks = true;
    let outcome = scan(dir.path(), opts);
    assert_eq!(names(&outcome.files), vec!["ok.md"]);
    assert_eq!(outcome.unreadable, 1);
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].kind, ErrorKind::FileIo);
}

#[test]
fn symlinks_are_ignored_by_default() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("real.md"), 1);
    std::os::unix::fs::symlink(dir.path().join("real.md"), dir.path().join("link.md")).unwrap();

    let outcome = scan(dir.path(), options());
    assert_eq!(names(&outcome.files), vec!["real.md"]);
}

#[test]
fn observer_sees_monotonic_counts() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["a.md", "b.md", "c.md"] {
        touch(&dir.path().join(name), 1);
    }

    let seen = std::cell::RefCell::new(Vec::new());
    let cancel = CancellationToken::new();
    let observer = |p: ScanProgress| seen.borrow_mut().push((p.seen, p.accepted));
    Scanner::new(options()).unwrap().scan(dir.path(), &cancel, Some(&observer)).unwrap();

    assert_eq!(*seen.borrow(), vec![(1, 1), (2, 2), (3, 3)]);
}

#[test]
fn cancellation_aborts_the_walk() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("a.md"), 1);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = Scanner::new(options()).unwrap().scan(dir.path(), &cancel, None);
    assert!(matches!(result, Err(ScanError::Cancelled)));
}
