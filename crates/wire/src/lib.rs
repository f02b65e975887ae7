// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! silo-wire: message framing and JSON-RPC envelopes.
//!
//! Master⇄worker IPC uses a 4-byte length prefix (big-endian) + JSON
//! payload over the worker's stdio. The upstream services and the outward
//! command surface speak JSON-RPC 2.0 over HTTP.

mod frame;
mod rpc;

pub use frame::{read_frame, read_msg, write_frame, write_msg, FrameError, MAX_FRAME};
pub use rpc::{codes, RpcError, RpcRequest, RpcResponse};
