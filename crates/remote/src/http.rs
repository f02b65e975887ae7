// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal HTTP/1.1 client for the upstream JSON-RPC services.
//!
//! Sends one request per connection and reads responses using
//! Content-Length framing (does not depend on connection close for EOF).

use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Parsed `http://host:port[/path]` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub path: String,
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("bad endpoint url '{url}'")]
    BadUrl { url: String },

    #[error("connect to {host}:{port} failed: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("request I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("request timed out after {0:?}")]
    TimedOut(Duration),

    #[error("malformed HTTP response: {0}")]
    Malformed(String),
}

impl Endpoint {
    pub fn parse(url: &str) -> Result<Self, HttpError> {
        let bad = || HttpError::BadUrl { url: url.to_string() };
        let rest = url.strip_prefix("http://").ok_or_else(bad)?;
        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };
        let (host, port) = authority.rsplit_once(':').ok_or_else(bad)?;
        if host.is_empty() {
            return Err(bad());
        }
        let port: u16 = port.parse().map_err(|_| bad())?;
        Ok(Self { host: host.to_string(), port, path: path.to_string() })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }
}

/// POST a JSON body. The timeout covers the entire operation (connect +
/// write + read); a server that accepts the connection but never answers
/// must not hang the pipeline.
pub async fn post_json(
    endpoint: &Endpoint,
    body: &str,
    timeout: Duration,
) -> Result<HttpReply, HttpError> {
    tokio::time::timeout(timeout, send_request(endpoint, body))
        .await
        .map_err(|_| HttpError::TimedOut(timeout))?
}

async fn send_request(endpoint: &Endpoint, body: &str) -> Result<HttpReply, HttpError> {
    let mut stream =
        TcpStream::connect((endpoint.host.as_str(), endpoint.port)).await.map_err(|source| {
            HttpError::Connect { host: endpoint.host.clone(), port: endpoint.port, source }
        })?;

    let request = format!(
        "POST {} HTTP/1.1\r\nHost: {}:{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        endpoint.path,
        endpoint.host,
        endpoint.port,
        body.len(),
        body
    );
    stream.write_all(request.as_bytes()).await?;

    let mut reader = BufReader::new(&mut stream);
    read_reply(&mut reader).await
}

/// Read and parse an HTTP/1.1 response from a buffered stream.
pub(crate) async fn read_reply<R>(reader: &mut BufReader<R>) -> Result<HttpReply, HttpError>
where
    R: AsyncRead + Unpin,
{
    let mut status_line = String::new();
    reader.read_line(&mut status_line).await?;
    if status_line.is_empty() {
        return Err(HttpError::Malformed("empty response".to_string()));
    }

    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| HttpError::Malformed(format!("bad status line: {}", status_line.trim())))?;

    // Headers: only Content-Length matters (case-insensitive).
    let mut content_length: usize = 0;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        if line == "\r\n" || line == "\n" || line.is_empty() {
            break;
        }
        let lower = line.to_ascii_lowercase();
        if let Some(value) = lower.strip_prefix("content-length:") {
            content_length = value
                .trim()
                .parse()
                .map_err(|_| HttpError::Malformed(format!("bad content-length: {}", line.trim())))?;
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await.map_err(|_| {
        HttpError::Malformed(format!("body shorter than content-length {content_length}"))
    })?;
    let body = String::from_utf8(body)
        .map_err(|_| HttpError::Malformed("body is not UTF-8".to_string()))?;

    Ok(HttpReply { status, body })
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
