// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scanner determinism specs.

use silo_engine::lock::LOCK_FILE_NAME;
use silo_engine::{ScanOptions, Scanner};
use std::path::Path;
use tokio_util::sync::CancellationToken;

fn options() -> ScanOptions {
    ScanOptions {
        recursive: true,
        extensions: vec![".txt".to_string(), ".md".to_string()],
        max_file_size: 1024 * 1024,
        follow_symlinks: false,
        include: Vec::new(),
        exclude: Vec::new(),
    }
}

fn names(dir: &Path) -> Vec<String> {
    let cancel = CancellationToken::new();
    Scanner::new(options())
        .unwrap()
        .scan(dir, &cancel, None)
        .unwrap()
        .files
        .iter()
        .map(|f| f.path.strip_prefix(dir).unwrap().display().to_string())
        .collect()
}

#[test]
fn walk_order_is_stable_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("b")).unwrap();
    std::fs::create_dir_all(dir.path().join("a")).unwrap();
    for path in ["z.md", "a/x.txt", "a/y.md", "b/w.txt"] {
        std::fs::write(dir.path().join(path), b"content").unwrap();
    }

    let first = names(dir.path());
    assert_eq!(first, vec!["a/x.txt", "a/y.md", "b/w.txt", "z.md"]);
    for _ in 0..3 {
        assert_eq!(names(dir.path()), first);
    }
}

#[test]
fn the_lock_artifact_is_invisible_to_the_scan() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("real.md"), b"content").unwrap();
    std::fs::write(dir.path().join(LOCK_FILE_NAME), b"{}").unwrap();

    assert_eq!(names(dir.path()), vec!["real.md"]);
}
