// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::{ErrorKind, Fault};
use std::io::Write;
use std::path::PathBuf;

#[test]
fn defaults_are_valid() {
    let config = Config::default();
    config.validate().expect("defaults must validate");
    assert_eq!(config.watch.supported_formats, vec![".txt", ".md"]);
    assert!(config.watch.recursive);
    assert_eq!(config.fleet.max_processes, 4);
    assert_eq!(config.upstream.store.url, "http://127.0.0.1:8007");
    assert_eq!(config.upstream.segmentation.url, "http://127.0.0.1:8009");
    assert_eq!(config.upstream.embedding.url, "http://127.0.0.1:8001");
}

#[test]
fn load_reads_partial_toml_with_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[watch]
directories = ["/tmp/docs"]
scan_interval = 60

[fleet]
max_processes = 2

[upstream.store]
url = "http://10.0.0.1:8007"
retries = 3
"#
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.watch.directories, vec![PathBuf::from("/tmp/docs")]);
    assert_eq!(config.watch.scan_interval, 60);
    assert_eq!(config.fleet.max_processes, 2);
    assert_eq!(config.upstream.store.url, "http://10.0.0.1:8007");
    // Untouched sections keep defaults.
    assert_eq!(config.chunking.max_blocks_per_batch, 64);
    assert_eq!(config.retry.max_attempts, 5);
}

#[test]
fn unknown_keys_are_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[watch]\ndirectores = []\n").unwrap();
    assert!(matches!(Config::load(file.path()), Err(ConfigError::Parse { .. })));
}

#[yare::parameterized(
    relative_dir  = { "[watch]\ndirectories = [\"docs\"]\n" },
    zero_fleet    = { "[fleet]\nmax_processes = 0\n" },
    bad_url       = { "[upstream.store]\nurl = \"ftp://x\"\n" },
    zero_retries  = { "[upstream.embedding]\nurl = \"http://h:1\"\nretries = 0\n" },
    inverted_hb   = { "[heartbeat]\ninterval = 30\ntimeout = 10\n" },
    bad_backoff   = { "[retry]\nbase_delay = 5.0\nmax_delay = 1.0\n" },
    bad_listen    = { "[rpc]\nlisten = \"not-an-addr\"\n" },
)]
fn invalid_configs_fail_validation(toml_text: &str) {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{toml_text}").unwrap();
    assert!(Config::load(file.path()).is_err(), "should reject: {toml_text}");
}

#[test]
fn formats_normalize_to_dotted_lowercase() {
    let watch = WatchConfig {
        supported_formats: vec!["MD".into(), ".Txt".into(), "rst".into()],
        ..WatchConfig::default()
    };
    assert_eq!(watch.normalized_formats(), vec![".md", ".txt", ".rst"]);
}

#[test]
fn config_error_classifies_as_config_invalid() {
    let err = ConfigError::Invalid { message: "x".into() };
    assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
}

#[test]
fn snapshot_roundtrips_through_json() {
    let mut config = Config::default();
    config.watch.directories = vec![PathBuf::from("/d1"), PathBuf::from("/d2")];
    let json = serde_json::to_string(&config).unwrap();
    let parsed: Config = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);
}
