// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The real HTTP/JSON-RPC client against an in-process TCP server.

use silo_core::config::{ServiceConfig, UpstreamConfig};
use silo_remote::facade::{RemoteStore, VectorStore};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Serve canned HTTP responses, one connection per response, in order.
async fn canned_server(responses: Vec<String>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        for response in responses {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            // Drain the request head and body; content is irrelevant.
            let mut buffer = [0u8; 4096];
            let _ = stream.read(&mut buffer).await;
            let _ = stream.write_all(response.as_bytes()).await;
        }
    });
    format!("http://{addr}")
}

fn http_json(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn upstream_at(url: &str) -> UpstreamConfig {
    let service =
        |u: &str| ServiceConfig { url: u.to_string(), timeout: 2, retries: 1 };
    UpstreamConfig {
        store: service(url),
        segmentation: service(url),
        embedding: service(url),
    }
}

#[tokio::test]
async fn delete_of_unknown_source_id_counts_as_success() {
    let url = canned_server(vec![http_json(
        "200 OK",
        r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32004,"message":"no such source"}}"#,
    )])
    .await;

    let store = RemoteStore::from_config(&upstream_at(&url)).unwrap();
    let cancel = CancellationToken::new();
    let deleted =
        store.delete_by_source("0e2f6a9e-8d5c-4a6e-9c5a-0b1d2e3f4a5b", &cancel).await.unwrap();
    assert_eq!(deleted, 0);
}

#[tokio::test]
async fn delete_reports_the_upstream_count() {
    let url = canned_server(vec![http_json(
        "200 OK",
        r#"{"jsonrpc":"2.0","id":1,"result":{"deleted":5}}"#,
    )])
    .await;

    let store = RemoteStore::from_config(&upstream_at(&url)).unwrap();
    let deleted = store
        .delete_by_source("0e2f6a9e-8d5c-4a6e-9c5a-0b1d2e3f4a5b", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(deleted, 5);
}

#[tokio::test]
async fn server_error_maps_to_unavailable() {
    let url = canned_server(vec![http_json("503 Service Unavailable", "busy")]).await;

    let store = RemoteStore::from_config(&upstream_at(&url)).unwrap();
    let error = store
        .list_files(std::path::Path::new("/docs"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(error, silo_remote::client::RemoteError::Unavailable { .. }));
}

#[tokio::test]
async fn garbage_reply_maps_to_protocol_error() {
    let url = canned_server(vec![http_json("200 OK", "not json at all")]).await;

    let store = RemoteStore::from_config(&upstream_at(&url)).unwrap();
    let error = store
        .list_files(std::path::Path::new("/docs"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(error, silo_remote::client::RemoteError::Protocol { .. }));
}

#[tokio::test]
async fn unreachable_service_maps_to_unavailable() {
    // Bind and drop to find a port with nothing listening.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let url = format!("http://127.0.0.1:{port}");

    let store = RemoteStore::from_config(&upstream_at(&url)).unwrap();
    let error = store
        .list_files(std::path::Path::new("/docs"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(error, silo_remote::client::RemoteError::Unavailable { .. }));
}

#[tokio::test]
async fn cancellation_preempts_the_call() {
    // A server that accepts but never answers.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        // Hold the connection open silently.
        tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        drop(stream);
    });

    let store = RemoteStore::from_config(&upstream_at(&format!("http://{addr}"))).unwrap();
    let cancel = CancellationToken::new();
    let call = store.list_files(std::path::Path::new("/docs"), &cancel);
    let cancelled = async {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        cancel.cancel();
    };
    let (result, ()) = tokio::join!(call, cancelled);
    assert!(matches!(result.unwrap_err(), silo_remote::client::RemoteError::Cancelled));
}
