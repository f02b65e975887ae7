// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `silo stats` - fleet and processing statistics.

use crate::client::DaemonClient;
use crate::output::{emit, OutputFormat};
use anyhow::Result;
use serde_json::{json, Value};

pub async fn run(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let system = client.call("get_system_stats", Value::Null).await?;
    let processing = client.call("get_processing_stats", Value::Null).await?;
    let queue = client.call("get_queue_status", Value::Null).await?;

    let combined = json!({ "system": system, "processing": processing, "queue": queue });
    emit(format, &combined, |v| {
        let system = &v["system"];
        println!(
            "watched {} | queued {} | fleet max {}",
            system["watched_directories"].as_u64().unwrap_or(0),
            system["queue_length"].as_u64().unwrap_or(0),
            system["fleet_max"].as_u64().unwrap_or(0),
        );
        let workers = &system["workers"];
        println!(
            "workers: {} running, {} starting, {} draining, {} failed, {} exited",
            workers["running"].as_u64().unwrap_or(0),
            workers["starting"].as_u64().unwrap_or(0),
            workers["draining"].as_u64().unwrap_or(0),
            workers["failed"].as_u64().unwrap_or(0),
            workers["exited"].as_u64().unwrap_or(0),
        );

        match v["processing"]["directories"].as_array() {
            Some(dirs) if !dirs.is_empty() => {
                for dir in dirs {
                    println!(
                        "{}: {} runs, {} files, {} chunks, {} failed",
                        dir["directory"].as_str().unwrap_or("?"),
                        dir["runs"].as_u64().unwrap_or(0),
                        dir["files_processed"].as_u64().unwrap_or(0),
                        dir["chunks_committed"].as_u64().unwrap_or(0),
                        dir["files_failed"].as_u64().unwrap_or(0),
                    );
                }
            }
            _ => println!("no completed runs yet"),
        }
    })
}
