// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The vector-store facade: one object over segmentation, embedding, and
//! chunk persistence. All upstream traffic in the pipeline goes through
//! this trait, which keeps the service graph acyclic and makes the whole
//! pipeline testable against an in-memory store.

use crate::client::{RemoteError, RpcClient};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use silo_core::chunk::Chunk;
use silo_core::config::UpstreamConfig;
use silo_core::file::IndexedFileRecord;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReceipt {
    pub created: u64,
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub service: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub services: Vec<ServiceHealth>,
}

impl HealthReport {
    pub fn all_ok(&self) -> bool {
        !self.services.is_empty() && self.services.iter().all(|s| s.ok)
    }
}

/// The four operations the core consumes, plus the segment/embed path the
/// chunking manager drives during Phase 1.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Files the store already has under `dir`. Used for diffing only.
    async fn list_files(
        &self,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Vec<IndexedFileRecord>, RemoteError>;

    /// Segmentation pass; may return more chunks than submitted. Order is
    /// meaningful and preserved.
    async fn segment(
        &self,
        chunks: Vec<Chunk>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Chunk>, RemoteError>;

    /// Embedding pass; must return exactly as many chunks as submitted.
    async fn embed(
        &self,
        chunks: Vec<Chunk>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Chunk>, RemoteError>;

    /// Persist one batch. The caller owns atomicity across batches.
    async fn commit_chunks(
        &self,
        chunks: &[Chunk],
        cancel: &CancellationToken,
    ) -> Result<CommitReceipt, RemoteError>;

    /// Remove everything carrying `source_id`. Idempotent: unknown ids
    /// count as zero deletions, not an error.
    async fn delete_by_source(
        &self,
        source_id: &str,
        cancel: &CancellationToken,
    ) -> Result<u64, RemoteError>;

    /// Never fails; per-service problems are reported inline.
    async fn health(&self) -> HealthReport;
}

/// Production facade speaking JSON-RPC to the three services.
pub struct RemoteStore {
    store: RpcClient,
    segmentation: RpcClient,
    embedding: RpcClient,
}

impl RemoteStore {
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, RemoteError> {
        Ok(Self {
            store: RpcClient::from_service("store", &config.store)?,
            segmentation: RpcClient::from_service("segmentation", &config.segmentation)?,
            embedding: RpcClient::from_service("embedding", &config.embedding)?,
        })
    }

    async fn probe(client: &RpcClient) -> ServiceHealth {
        let cancel = CancellationToken::new();
        match client.call("service.health", Value::Null, &cancel).await {
            Ok(_) => ServiceHealth { service: client.service().to_string(), ok: true, detail: None },
            Err(e) => ServiceHealth {
                service: client.service().to_string(),
                ok: false,
                detail: Some(e.to_string()),
            },
        }
    }
}

#[async_trait]
impl VectorStore for RemoteStore {
    async fn list_files(
        &self,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Vec<IndexedFileRecord>, RemoteError> {
        let result =
            self.store.call("files.list", json!({ "directory": dir }), cancel).await?;
        parse_field(&self.store, result, "files")
    }

    async fn segment(
        &self,
        chunks: Vec<Chunk>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Chunk>, RemoteError> {
        let result = self
            .segmentation
            .call("segments.split", json!({ "chunks": chunks }), cancel)
            .await?;
        parse_field(&self.segmentation, result, "chunks")
    }

    async fn embed(
        &self,
        chunks: Vec<Chunk>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Chunk>, RemoteError> {
        let result =
            self.embedding.call("embeddings.encode", json!({ "chunks": chunks }), cancel).await?;
        parse_field(&self.embedding, result, "chunks")
    }

    async fn commit_chunks(
        &self,
        chunks: &[Chunk],
        cancel: &CancellationToken,
    ) -> Result<CommitReceipt, RemoteError> {
        let result = self.store.call("chunks.commit", json!({ "chunks": chunks }), cancel).await?;
        serde_json::from_value(result).map_err(|e| RemoteError::Protocol {
            service: self.store.service().to_string(),
            detail: format!("bad commit receipt: {e}"),
        })
    }

    async fn delete_by_source(
        &self,
        source_id: &str,
        cancel: &CancellationToken,
    ) -> Result<u64, RemoteError> {
        let result = self
            .store
            .call("chunks.delete_by_source", json!({ "source_id": source_id }), cancel)
            .await;
        match result {
            Ok(value) => {
                let deleted = value.get("deleted").and_then(Value::as_u64).unwrap_or(0);
                Ok(deleted)
            }
            // Unknown source_id: already-deleted is the state we wanted.
            Err(RemoteError::NotFound { service }) => {
                warn!(source_id, service = %service, "delete_by_source found nothing");
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    async fn health(&self) -> HealthReport {
        let (store, segmentation, embedding) = tokio::join!(
            Self::probe(&self.store),
            Self::probe(&self.segmentation),
            Self::probe(&self.embedding),
        );
        HealthReport { services: vec![store, segmentation, embedding] }
    }
}

fn parse_field<T: serde::de::DeserializeOwned>(
    client: &RpcClient,
    result: Value,
    field: &str,
) -> Result<T, RemoteError> {
    let value = result
        .get(field)
        .cloned()
        .ok_or_else(|| RemoteError::Protocol {
            service: client.service().to_string(),
            detail: format!("reply missing '{field}'"),
        })?;
    serde_json::from_value(value).map_err(|e| RemoteError::Protocol {
        service: client.service().to_string(),
        detail: format!("bad '{field}' payload: {e}"),
    })
}
