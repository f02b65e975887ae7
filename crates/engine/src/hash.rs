// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content hashing for the diff step.

use sha2::{Digest, Sha256};
use std::path::Path;

/// SHA-256 of a file's content, hex-encoded.
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_known_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(
            sha256_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn identical_content_hashes_identically() {
        let dir = tempfile::tempdir().unwrap();
        let one = dir.path().join("one.md");
        let two = dir.path().join("two.md");
        std::fs::write(&one, b"same bytes").unwrap();
        std::fs::write(&two, b"same bytes").unwrap();
        assert_eq!(sha256_file(&one).unwrap(), sha256_file(&two).unwrap());
    }
}
