// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! silo-core: data model, error taxonomy, and configuration for the
//! silo directory-indexing fleet.
//!
//! Everything here is plain data plus small invariant checks. The crates
//! above (engine, worker, daemon) own the I/O.

pub mod block;
pub mod chunk;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod file;
pub mod retry;

pub use block::{Block, BlockKind};
pub use chunk::{is_uuid_v4, Chunk, ChunkInvalid, ChunkStatus};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    ChunkingConfig, Config, ConfigError, FleetConfig, HeartbeatConfig, LockConfig, RetryConfig,
    RpcConfig, ServiceConfig, UpstreamConfig, WatchConfig,
};
pub use error::{ErrorKind, Fault, ProcessingError, Stage};
pub use event::{
    FileOutcome, MasterMsg, RunReport, TerminalStatus, WorkerEvent, WorkerStage, PROTOCOL_VERSION,
};
pub use file::{FileRecord, IndexedFileRecord};
pub use retry::RetryPolicy;
