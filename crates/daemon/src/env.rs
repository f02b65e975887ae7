// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: SILO_STATE_DIR > XDG_STATE_HOME/silo >
/// ~/.local/state/silo
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("SILO_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("silo"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/silo"))
}

/// Config file path override (`silod --config` wins over this).
pub fn config_path() -> Option<PathBuf> {
    std::env::var("SILO_CONFIG").ok().map(PathBuf::from)
}

/// Shutdown drain timeout (default 10s, `SILO_DRAIN_TIMEOUT_MS`).
pub fn drain_timeout() -> Duration {
    std::env::var("SILO_DRAIN_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(10))
}

/// Worker binary override, for tests and packaging layouts where the
/// worker does not sit next to `silod`.
pub fn worker_bin() -> Option<PathBuf> {
    std::env::var("SILO_WORKER_BIN").ok().map(PathBuf::from)
}

/// How long exited worker records stay visible in status queries.
pub fn exited_retention() -> Duration {
    std::env::var("SILO_EXITED_RETENTION_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(600))
}
