// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `silo` - CLI for the silo indexing daemon.

mod client;
mod commands;
mod output;

use clap::{Parser, Subcommand};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "silo", version, about = "Directory indexing daemon control")]
struct Cli {
    /// Address of the daemon's command surface.
    #[arg(long, global = true, default_value = "127.0.0.1:8010")]
    rpc: String,

    /// Print raw JSON instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Daemon lifecycle
    Daemon(commands::daemon::DaemonArgs),
    /// Watched-directory management
    Watch(commands::watch::WatchArgs),
    /// Processing and fleet statistics
    Stats,
    /// Daemon and upstream-service health
    Health,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let format = if cli.json { OutputFormat::Json } else { OutputFormat::Text };
    let client = client::DaemonClient::new(&cli.rpc);

    let result = match cli.command {
        Command::Daemon(args) => commands::daemon::run(args, &client, format).await,
        Command::Watch(args) => commands::watch::run(args, &client, format).await,
        Command::Stats => commands::stats::run(&client, format).await,
        Command::Health => commands::daemon::health(&client, format).await,
    };

    if let Err(e) = result {
        eprintln!("silo: {e:#}");
        std::process::exit(1);
    }
}
