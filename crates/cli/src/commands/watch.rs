// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `silo watch` - watched-directory management.

use crate::client::DaemonClient;
use crate::output::{emit, OutputFormat};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct WatchArgs {
    #[command(subcommand)]
    pub command: WatchCommand,
}

#[derive(Subcommand)]
pub enum WatchCommand {
    /// Start watching a directory
    Add { directory: PathBuf },
    /// Stop watching a directory (cancels a running worker)
    Remove { directory: PathBuf },
    /// List watched directories
    List,
    /// Per-directory status: worker state, lock, totals
    Status {
        /// One directory; all watched directories when omitted
        directory: Option<PathBuf>,
    },
}

pub async fn run(args: WatchArgs, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    match args.command {
        WatchCommand::Add { directory } => {
            let directory = absolute(&directory)?;
            let value =
                client.call("start_watching", json!({ "directory": &directory })).await?;
            emit(format, &value, |_| println!("watching {}", directory.display()))
        }
        WatchCommand::Remove { directory } => {
            let directory = absolute(&directory)?;
            let value = client.call("stop_watching", json!({ "directory": &directory })).await?;
            emit(format, &value, |v| {
                if v["cancelled"].as_bool().unwrap_or(false) {
                    println!("stopped watching {} (worker cancelled)", directory.display());
                } else {
                    println!("stopped watching {}", directory.display());
                }
            })
        }
        WatchCommand::List => {
            let value = client.call("list_watched_directories", Value::Null).await?;
            emit(format, &value, |v| {
                match v["directories"].as_array() {
                    Some(dirs) if !dirs.is_empty() => {
                        for dir in dirs {
                            println!("{}", dir.as_str().unwrap_or("?"));
                        }
                    }
                    _ => println!("no watched directories"),
                }
            })
        }
        WatchCommand::Status { directory } => {
            let params = match directory {
                Some(directory) => json!({ "directory": absolute(&directory)? }),
                None => Value::Null,
            };
            let value = client.call("get_watch_status", params).await?;
            emit(format, &value, print_statuses)
        }
    }
}

fn print_statuses(value: &Value) {
    let Some(entries) = value.as_array() else {
        return;
    };
    if entries.is_empty() {
        println!("no watched directories");
        return;
    }
    for entry in entries {
        let state = entry["state"].as_str().unwrap_or("idle");
        let stage = entry["stage"].as_str().map(|s| format!(" ({s})")).unwrap_or_default();
        let lock = if entry["lock"].is_null() {
            String::new()
        } else {
            let pid = entry["lock"]["pid"].as_i64().unwrap_or(0);
            let stale = entry["lock"]["stale"].as_bool().unwrap_or(false);
            format!(", locked by {pid}{}", if stale { " [stale]" } else { "" })
        };
        println!("{}: {state}{stage}{lock}", entry["directory"].as_str().unwrap_or("?"));
    }
}

/// RPC paths are absolute; resolve relative arguments against the cwd.
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("cannot resolve current directory")?;
    Ok(cwd.join(path))
}
