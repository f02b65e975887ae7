// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC caller over the minimal HTTP client, classifying transport,
//! protocol, and application failures into the shared taxonomy.

use crate::http::{post_json, Endpoint, HttpError};
use serde_json::Value;
use silo_core::config::ServiceConfig;
use silo_core::error::{ErrorKind, Fault};
use silo_wire::{codes, RpcRequest, RpcResponse};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum RemoteError {
    /// Network fault, timeout, or 5xx: the service may recover.
    #[error("{service} unavailable: {detail}")]
    Unavailable { service: String, detail: String },

    /// The service answered, but not with JSON-RPC we understand.
    #[error("{service} protocol error: {detail}")]
    Protocol { service: String, detail: String },

    /// The service understood and said no.
    #[error("{service} rejected the request (code {code}): {message}")]
    Rejected { service: String, code: i64, message: String },

    /// Application-level not-found, e.g. deleting an unknown source_id.
    #[error("{service} reports no such entity")]
    NotFound { service: String },

    #[error("call cancelled")]
    Cancelled,
}

impl Fault for RemoteError {
    fn kind(&self) -> ErrorKind {
        match self {
            RemoteError::Unavailable { .. } => ErrorKind::UpstreamUnavailable,
            RemoteError::Protocol { .. } => ErrorKind::UpstreamProtocol,
            RemoteError::Rejected { .. } | RemoteError::NotFound { .. } => ErrorKind::Rejected,
            RemoteError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// One upstream service: endpoint, per-attempt timeout, request ids.
pub struct RpcClient {
    service: String,
    endpoint: Endpoint,
    timeout: Duration,
    seq: AtomicU64,
}

impl RpcClient {
    pub fn from_service(name: &str, config: &ServiceConfig) -> Result<Self, RemoteError> {
        let endpoint = Endpoint::parse(&config.url).map_err(|e| RemoteError::Protocol {
            service: name.to_string(),
            detail: e.to_string(),
        })?;
        Ok(Self {
            service: name.to_string(),
            endpoint,
            timeout: Duration::from_secs(config.timeout),
            seq: AtomicU64::new(1),
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// One JSON-RPC call. Cancellation wins over an in-flight request;
    /// the connection is dropped, which aborts the HTTP exchange.
    pub async fn call(
        &self,
        method: &str,
        params: Value,
        cancel: &CancellationToken,
    ) -> Result<Value, RemoteError> {
        let id = self.seq.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(id, method, params);
        let body = serde_json::to_string(&request)
            .map_err(|e| self.protocol(format!("unencodable request: {e}")))?;

        let reply = tokio::select! {
            _ = cancel.cancelled() => return Err(RemoteError::Cancelled),
            reply = post_json(&self.endpoint, &body, self.timeout) => reply,
        };

        let reply = reply.map_err(|e| match e {
            HttpError::Malformed(detail) => self.protocol(detail),
            HttpError::BadUrl { url } => self.protocol(format!("bad url {url}")),
            other => RemoteError::Unavailable {
                service: self.service.clone(),
                detail: other.to_string(),
            },
        })?;

        if reply.is_server_error() {
            return Err(RemoteError::Unavailable {
                service: self.service.clone(),
                detail: format!("HTTP {}", reply.status),
            });
        }
        if reply.is_client_error() {
            return Err(RemoteError::Rejected {
                service: self.service.clone(),
                code: i64::from(reply.status),
                message: format!("HTTP {}", reply.status),
            });
        }

        let response: RpcResponse = serde_json::from_str(&reply.body)
            .map_err(|e| self.protocol(format!("bad JSON-RPC reply: {e}")))?;
        if !response.is_well_formed() {
            return Err(self.protocol("reply carries neither result nor error".to_string()));
        }
        if let Some(error) = response.error {
            if error.code == codes::NOT_FOUND {
                return Err(RemoteError::NotFound { service: self.service.clone() });
            }
            return Err(RemoteError::Rejected {
                service: self.service.clone(),
                code: error.code,
                message: error.message,
            });
        }
        // is_well_formed guarantees a result when there is no error.
        Ok(response.result.unwrap_or(Value::Null))
    }

    fn protocol(&self, detail: String) -> RemoteError {
        RemoteError::Protocol { service: self.service.clone(), detail }
    }
}
