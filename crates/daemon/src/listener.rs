// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The outward command surface: JSON-RPC 2.0 over HTTP.
//!
//! Every method is a thin projection over master state; none of them is
//! on the processing hot path. One request per connection.

use crate::lifecycle::DaemonCtx;
use crate::stats;
use serde::Deserialize;
use serde_json::{json, Value};
use silo_core::clock::{Clock, SystemClock};
use silo_core::event::PROTOCOL_VERSION;
use silo_engine::lock::{LockManager, LockStatus};
use silo_wire::{codes, RpcRequest, RpcResponse};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error};

pub async fn serve(ctx: Arc<DaemonCtx>, listener: TcpListener) {
    loop {
        tokio::select! {
            _ = ctx.shutdown.cancelled() => return,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let ctx = Arc::clone(&ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &ctx).await {
                            debug!(error = %e, "command connection failed");
                        }
                    });
                }
                Err(e) => error!(error = %e, "accept failed"),
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, ctx: &Arc<DaemonCtx>) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    if !request_line.starts_with("POST ") {
        write_half
            .write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
            .await?;
        return Ok(());
    }

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        if line == "\r\n" || line == "\n" || line.is_empty() {
            break;
        }
        let lower = line.to_ascii_lowercase();
        if let Some(value) = lower.strip_prefix("content-length:") {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;

    let response = match serde_json::from_slice::<RpcRequest>(&body) {
        Ok(request) if request.is_well_formed() => dispatch(ctx, request).await,
        Ok(request) => {
            RpcResponse::fail(request.id, codes::INVALID_REQUEST, "not a JSON-RPC 2.0 request")
        }
        Err(e) => RpcResponse::fail(Value::Null, codes::PARSE_ERROR, e.to_string()),
    };

    let payload = serde_json::to_vec(&response).unwrap_or_else(|_| b"{}".to_vec());
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        payload.len()
    );
    write_half.write_all(head.as_bytes()).await?;
    write_half.write_all(&payload).await?;
    write_half.flush().await?;
    Ok(())
}

type MethodResult = Result<Value, (i64, String)>;

#[derive(Deserialize)]
struct DirParams {
    directory: PathBuf,
}

#[derive(Deserialize, Default)]
struct WatchStatusParams {
    #[serde(default)]
    directory: Option<PathBuf>,
}

pub(crate) async fn dispatch(ctx: &Arc<DaemonCtx>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    let result = match request.method.as_str() {
        "health_check" => health_check(ctx).await,
        "get_system_stats" => system_stats(ctx),
        "get_processing_stats" => processing_stats(ctx),
        "get_queue_status" => queue_status(ctx),
        "start_watching" => start_watching(ctx, request.params),
        "stop_watching" => stop_watching(ctx, request.params),
        "get_watch_status" => watch_status(ctx, request.params),
        "list_watched_directories" => list_watched(ctx),
        "shutdown" => shutdown(ctx),
        other => Err((codes::METHOD_NOT_FOUND, format!("unknown method '{other}'"))),
    };
    match result {
        Ok(value) => RpcResponse::ok(id, value),
        Err((code, message)) => RpcResponse::fail(id, code, message),
    }
}

async fn health_check(ctx: &Arc<DaemonCtx>) -> MethodResult {
    let upstream = ctx.facade.health().await;
    let (live, queued) = {
        let fleet = ctx.fleet.lock();
        (fleet.live_count(), fleet.queue_len())
    };
    Ok(json!({
        "status": if upstream.all_ok() { "ok" } else { "degraded" },
        "version": PROTOCOL_VERSION,
        "uptime_s": ctx.started.elapsed().as_secs(),
        "fleet": { "live": live, "queued": queued, "max": ctx.config.fleet.max_processes },
        "upstream": upstream,
    }))
}

fn system_stats(ctx: &Arc<DaemonCtx>) -> MethodResult {
    let fleet = ctx.fleet.lock();
    let value = stats::SystemStats {
        version: PROTOCOL_VERSION.to_string(),
        uptime_s: ctx.started.elapsed().as_secs(),
        watched_directories: fleet.watched().count(),
        queue_length: fleet.queue_len(),
        fleet_max: ctx.config.fleet.max_processes,
        workers: stats::worker_counts(&fleet),
    };
    encode(&value)
}

fn processing_stats(ctx: &Arc<DaemonCtx>) -> MethodResult {
    encode(&stats::processing_stats(&ctx.fleet.lock()))
}

fn queue_status(ctx: &Arc<DaemonCtx>) -> MethodResult {
    encode(&stats::queue_status(&ctx.fleet.lock()))
}

fn start_watching(ctx: &Arc<DaemonCtx>, params: Value) -> MethodResult {
    let params: DirParams = decode_params(params)?;
    if !params.directory.is_absolute() {
        return Err((codes::INVALID_PARAMS, "directory must be absolute".to_string()));
    }
    let (added, queued) = {
        let mut fleet = ctx.fleet.lock();
        let added = fleet.watch(params.directory.clone());
        let queued = fleet.admit_now(&params.directory, SystemClock.epoch_ms());
        (added, queued)
    };
    ctx.kick.notify_one();
    Ok(json!({ "directory": params.directory, "watching": true, "added": added, "queued": queued }))
}

fn stop_watching(ctx: &Arc<DaemonCtx>, params: Value) -> MethodResult {
    let params: DirParams = decode_params(params)?;
    let removed = ctx.fleet.lock().unwatch(&params.directory);
    let cancelled = ctx.cancel_worker(&params.directory);
    Ok(json!({
        "directory": params.directory,
        "watching": false,
        "removed": removed,
        "cancelled": cancelled,
    }))
}

fn watch_status(ctx: &Arc<DaemonCtx>, params: Value) -> MethodResult {
    let params: WatchStatusParams = decode_params(params)?;
    let directories: Vec<PathBuf> = match params.directory {
        Some(dir) => vec![dir],
        None => ctx.fleet.lock().watched().cloned().collect(),
    };

    let manager = LockManager::new();
    let now = SystemClock.utc();
    let mut statuses = Vec::with_capacity(directories.len());
    for directory in directories {
        let (watched, state, stage, totals) = {
            let fleet = ctx.fleet.lock();
            let record = fleet.record(&directory);
            (
                fleet.is_watched(&directory),
                record.map(|r| r.state),
                record.and_then(|r| r.stage),
                fleet.totals().get(&directory).cloned(),
            )
        };
        let lock = match manager.inspect(&directory) {
            Ok(Some(lock)) => Some(stats::LockView {
                pid: lock.process_id,
                created_at: lock.created_at.to_rfc3339(),
                status: lock_status_name(lock.status).to_string(),
                stale: lock.is_stale(now, ctx.config.lock.timeout),
            }),
            Ok(None) => None,
            Err(_) => Some(stats::LockView {
                pid: 0,
                created_at: String::new(),
                status: "corrupt".to_string(),
                stale: true,
            }),
        };
        statuses.push(stats::WatchStatus { directory, watched, state, stage, lock, totals });
    }
    encode(&statuses)
}

fn list_watched(ctx: &Arc<DaemonCtx>) -> MethodResult {
    let watched: Vec<PathBuf> = ctx.fleet.lock().watched().cloned().collect();
    Ok(json!({ "directories": watched }))
}

fn shutdown(ctx: &Arc<DaemonCtx>) -> MethodResult {
    ctx.shutdown.cancel();
    Ok(json!({ "stopping": true }))
}

fn lock_status_name(status: LockStatus) -> &'static str {
    match status {
        LockStatus::Active => "active",
        LockStatus::Completing => "completing",
        LockStatus::Failed => "failed",
    }
}

fn decode_params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, (i64, String)> {
    serde_json::from_value(params).map_err(|e| (codes::INVALID_PARAMS, e.to_string()))
}

fn encode<T: serde::Serialize>(value: &T) -> MethodResult {
    serde_json::to_value(value).map_err(|e| (codes::INTERNAL_ERROR, e.to_string()))
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
