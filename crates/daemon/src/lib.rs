// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! silo-daemon: the master process.
//!
//! Owns the configuration snapshot and the fleet table, admits
//! directories, spawns and monitors workers, sweeps orphan locks, and
//! serves the outward JSON-RPC command surface.

pub mod env;
pub mod fleet;
pub mod lifecycle;
pub mod listener;
pub mod monitor;
pub mod reconcile;
pub mod spawn;
pub mod stats;
pub mod sweep;

pub use fleet::{DirectoryTotals, FleetState, WorkerRecord, WorkerState};
pub use lifecycle::{DaemonCtx, LifecycleError};
