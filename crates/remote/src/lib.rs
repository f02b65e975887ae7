// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! silo-remote: everything that crosses the network.
//!
//! A minimal HTTP/1.1 client, a JSON-RPC caller that classifies failures
//! into the shared taxonomy, the vector-store facade over the three
//! upstream services, and the read model used for diffing.

pub mod client;
pub mod facade;
pub mod http;
pub mod view;

pub use client::{RemoteError, RpcClient};
pub use facade::{CommitReceipt, HealthReport, RemoteStore, ServiceHealth, VectorStore};
pub use http::{Endpoint, HttpError, HttpReply};
pub use view::{DatabaseView, IndexSnapshot};
