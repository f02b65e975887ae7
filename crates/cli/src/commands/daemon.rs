// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `silo daemon` - daemon lifecycle commands.

use crate::client::DaemonClient;
use crate::output::{emit, field, OutputFormat};
use anyhow::{anyhow, bail, Result};
use clap::{Args, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon (background unless --foreground)
    Start {
        /// Run in the foreground (useful for debugging)
        #[arg(long)]
        foreground: bool,
        /// Config file passed through to silod
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },
    /// Stop the daemon gracefully
    Stop,
    /// Check daemon status
    Status,
}

pub async fn run(args: DaemonArgs, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    match args.command {
        DaemonCommand::Start { foreground, config } => start(client, foreground, config).await,
        DaemonCommand::Stop => stop(client, format).await,
        DaemonCommand::Status => health(client, format).await,
    }
}

async fn start(client: &DaemonClient, foreground: bool, config: Option<PathBuf>) -> Result<()> {
    if client.is_up().await {
        bail!("daemon is already running");
    }

    let silod = find_silod()?;
    let mut command = Command::new(&silod);
    if let Some(config) = &config {
        command.arg("--config").arg(config);
    }

    if foreground {
        let status = command.status()?;
        if !status.success() {
            bail!("daemon exited with status {status}");
        }
        return Ok(());
    }

    command.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
    let child = command.spawn()?;
    // Detach: the daemon owns its own lifetime from here.
    drop(child);

    for _ in 0..30 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if client.is_up().await {
            println!("daemon started");
            return Ok(());
        }
    }
    bail!("daemon did not come up; check the logs under the state directory")
}

async fn stop(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let value = client.call("shutdown", Value::Null).await?;
    emit(format, &value, |_| println!("daemon stopping"))
}

pub async fn health(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let value = client.call("health_check", Value::Null).await?;
    emit(format, &value, |v| {
        println!("status:  {}", field(v, "status"));
        println!("version: {}", field(v, "version"));
        println!("uptime:  {}s", v["uptime_s"].as_u64().unwrap_or(0));
        println!(
            "fleet:   {}/{} live, {} queued",
            v["fleet"]["live"].as_u64().unwrap_or(0),
            v["fleet"]["max"].as_u64().unwrap_or(0),
            v["fleet"]["queued"].as_u64().unwrap_or(0),
        );
        if let Some(services) = v["upstream"]["services"].as_array() {
            for service in services {
                let ok = service["ok"].as_bool().unwrap_or(false);
                println!(
                    "  {} {}",
                    if ok { "✓" } else { "✗" },
                    field(service, "service"),
                );
            }
        }
    })
}

/// silod sits next to the CLI binary, or on PATH.
fn find_silod() -> Result<PathBuf> {
    let exe = std::env::current_exe().map_err(|e| anyhow!("cannot locate own binary: {e}"))?;
    if let Some(dir) = exe.parent() {
        let sibling = dir.join("silod");
        if sibling.exists() {
            return Ok(sibling);
        }
    }
    Ok(PathBuf::from("silod"))
}
