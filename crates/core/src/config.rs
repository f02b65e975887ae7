// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration for the master, snapshotted into every worker.
//!
//! Loaded from TOML once at master startup, validated, then shipped to
//! workers inside the Hello handshake so the fleet never re-reads files.

use crate::error::{ErrorKind, Fault};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub fleet: FleetConfig,
    #[serde(default)]
    pub lock: LockConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    #[serde(default)]
    pub rpc: RpcConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Absolute paths of the directories to index.
    #[serde(default)]
    pub directories: Vec<PathBuf>,
    /// Allowed extensions, with or without the leading dot.
    #[serde(default = "default_formats")]
    pub supported_formats: Vec<String>,
    #[serde(default = "default_true")]
    pub recursive: bool,
    /// Files larger than this are recorded as Skipped-TooLarge.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Seconds between reconcile sweeps.
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,
    /// Glob patterns; empty include list admits everything.
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Emit a progress event every N processed files.
    #[serde(default = "default_progress_every")]
    pub progress_every: u64,
}

impl WatchConfig {
    /// Extensions normalized to lowercase with a leading dot.
    pub fn normalized_formats(&self) -> Vec<String> {
        self.supported_formats
            .iter()
            .map(|f| {
                let f = f.to_ascii_lowercase();
                if f.starts_with('.') {
                    f
                } else {
                    format!(".{f}")
                }
            })
            .collect()
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            supported_formats: default_formats(),
            recursive: true,
            max_file_size: default_max_file_size(),
            scan_interval: default_scan_interval(),
            include: Vec::new(),
            exclude: Vec::new(),
            progress_every: default_progress_every(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FleetConfig {
    /// Concurrent worker cap.
    #[serde(default = "default_max_processes")]
    pub max_processes: u32,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self { max_processes: default_max_processes() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockConfig {
    /// Advisory staleness threshold in seconds. Liveness of the owning
    /// pid, not age, is the reclaim authority.
    #[serde(default = "default_lock_timeout")]
    pub timeout: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self { timeout: default_lock_timeout() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChunkingConfig {
    /// Maximum body length per chunk, in bytes (split on char boundaries).
    #[serde(default = "default_max_block_size")]
    pub max_block_size: usize,
    /// Commit batch size ceiling.
    #[serde(default = "default_max_blocks_per_batch")]
    pub max_blocks_per_batch: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_block_size: default_max_block_size(),
            max_blocks_per_batch: default_max_blocks_per_batch(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    #[serde(default = "default_store")]
    pub store: ServiceConfig,
    #[serde(default = "default_segmentation")]
    pub segmentation: ServiceConfig,
    #[serde(default = "default_embedding")]
    pub embedding: ServiceConfig,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            store: default_store(),
            segmentation: default_segmentation(),
            embedding: default_embedding(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub url: String,
    /// Per-attempt timeout in seconds.
    #[serde(default = "default_service_timeout")]
    pub timeout: u64,
    /// Attempt ceiling for calls to this service.
    #[serde(default = "default_service_retries")]
    pub retries: u32,
}

impl ServiceConfig {
    fn at(url: &str) -> Self {
        Self {
            url: url.to_string(),
            timeout: default_service_timeout(),
            retries: default_service_retries(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Seconds; first backoff step.
    #[serde(default = "default_base_delay")]
    pub base_delay: f64,
    #[serde(default = "default_max_delay")]
    pub max_delay: f64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
            max_attempts: default_max_attempts(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeartbeatConfig {
    /// Seconds between worker heartbeats.
    #[serde(default = "default_heartbeat_interval")]
    pub interval: u64,
    /// Seconds of silence after which a worker is declared hung.
    #[serde(default = "default_heartbeat_timeout")]
    pub timeout: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self { interval: default_heartbeat_interval(), timeout: default_heartbeat_timeout() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcConfig {
    /// Address of the outward JSON-RPC command surface.
    #[serde(default = "default_rpc_listen")]
    pub listen: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self { listen: default_rpc_listen() }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("invalid config: {message}")]
    Invalid { message: String },
}

impl Fault for ConfigError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::ConfigInvalid
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config: Config = toml::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source: Box::new(source) })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for dir in &self.watch.directories {
            if !dir.is_absolute() {
                return Err(invalid(format!(
                    "watch.directories entry '{}' is not absolute",
                    dir.display()
                )));
            }
        }
        if self.watch.supported_formats.is_empty() {
            return Err(invalid("watch.supported_formats must not be empty"));
        }
        if self.watch.max_file_size == 0 {
            return Err(invalid("watch.max_file_size must be positive"));
        }
        if self.watch.scan_interval == 0 {
            return Err(invalid("watch.scan_interval must be positive"));
        }
        if self.watch.progress_every == 0 {
            return Err(invalid("watch.progress_every must be positive"));
        }
        if self.fleet.max_processes == 0 {
            return Err(invalid("fleet.max_processes must be at least 1"));
        }
        if self.chunking.max_block_size == 0 {
            return Err(invalid("chunking.max_block_size must be positive"));
        }
        if self.chunking.max_blocks_per_batch == 0 {
            return Err(invalid("chunking.max_blocks_per_batch must be positive"));
        }
        for (name, service) in self.upstream.services() {
            if !service.url.starts_with("http://") {
                return Err(invalid(format!(
                    "upstream.{name}.url '{}' must start with http://",
                    service.url
                )));
            }
            if service.timeout == 0 {
                return Err(invalid(format!("upstream.{name}.timeout must be positive")));
            }
            if service.retries == 0 {
                return Err(invalid(format!("upstream.{name}.retries must be at least 1")));
            }
        }
        if self.retry.base_delay <= 0.0 {
            return Err(invalid("retry.base_delay must be positive"));
        }
        if self.retry.max_delay < self.retry.base_delay {
            return Err(invalid("retry.max_delay must be >= retry.base_delay"));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts must be at least 1"));
        }
        if self.heartbeat.interval == 0 {
            return Err(invalid("heartbeat.interval must be positive"));
        }
        if self.heartbeat.timeout <= self.heartbeat.interval {
            return Err(invalid("heartbeat.timeout must exceed heartbeat.interval"));
        }
        if self.rpc.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(invalid(format!("rpc.listen '{}' is not a socket address", self.rpc.listen)));
        }
        Ok(())
    }
}

impl UpstreamConfig {
    pub fn services(&self) -> [(&'static str, &ServiceConfig); 3] {
        [
            ("store", &self.store),
            ("segmentation", &self.segmentation),
            ("embedding", &self.embedding),
        ]
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { message: message.into() }
}

fn default_true() -> bool {
    true
}

fn default_formats() -> Vec<String> {
    vec![".txt".to_string(), ".md".to_string()]
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_scan_interval() -> u64 {
    300
}

fn default_progress_every() -> u64 {
    1
}

fn default_max_processes() -> u32 {
    4
}

fn default_lock_timeout() -> u64 {
    3600
}

fn default_max_block_size() -> usize {
    2000
}

fn default_max_blocks_per_batch() -> usize {
    64
}

fn default_store() -> ServiceConfig {
    ServiceConfig::at("http://127.0.0.1:8007")
}

fn default_segmentation() -> ServiceConfig {
    ServiceConfig::at("http://127.0.0.1:8009")
}

fn default_embedding() -> ServiceConfig {
    ServiceConfig::at("http://127.0.0.1:8001")
}

fn default_service_timeout() -> u64 {
    30
}

fn default_service_retries() -> u32 {
    3
}

fn default_base_delay() -> f64 {
    0.5
}

fn default_max_delay() -> f64 {
    30.0
}

fn default_max_attempts() -> u32 {
    5
}

fn default_heartbeat_interval() -> u64 {
    5
}

fn default_heartbeat_timeout() -> u64 {
    30
}

fn default_rpc_listen() -> String {
    "127.0.0.1:8010".to_string()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
