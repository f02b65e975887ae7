// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC client for the daemon's command surface.

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use silo_remote::http::{post_json, Endpoint, HttpError};
use silo_wire::{RpcRequest, RpcResponse};
use std::time::Duration;

pub struct DaemonClient {
    addr: String,
    timeout: Duration,
}

impl DaemonClient {
    pub fn new(addr: &str) -> Self {
        Self { addr: addr.to_string(), timeout: Duration::from_secs(10) }
    }

    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let endpoint = Endpoint::parse(&format!("http://{}/", self.addr))
            .map_err(|e| anyhow!("bad rpc address '{}': {e}", self.addr))?;
        let request = RpcRequest::new(1, method, params);
        let body = serde_json::to_string(&request)?;

        let reply = match post_json(&endpoint, &body, self.timeout).await {
            Ok(reply) => reply,
            Err(HttpError::Connect { .. }) => {
                bail!("daemon is not running on {} (start it with `silo daemon start`)", self.addr)
            }
            Err(e) => return Err(anyhow!(e)).context(format!("calling {method}")),
        };

        let response: RpcResponse = serde_json::from_str(&reply.body)
            .with_context(|| format!("malformed reply to {method}"))?;
        if let Some(error) = response.error {
            bail!("{method} failed: {} (code {})", error.message, error.code);
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Whether a daemon answers on the configured address.
    pub async fn is_up(&self) -> bool {
        self.call("health_check", Value::Null).await.is_ok()
    }
}
