// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! silod entry point.
//!
//! Loads the TOML config (`--config`, else `SILO_CONFIG`, else built-in
//! defaults), initializes logging into the state directory, and runs
//! the master until SIGTERM/SIGINT or an RPC `shutdown`.

use silo_core::config::Config;
use silo_daemon::{env, lifecycle};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

fn main() {
    let code = silod_main();
    std::process::exit(code);
}

fn silod_main() -> i32 {
    let config_path = config_path_arg().or_else(env::config_path);
    let config = match &config_path {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("silod: {e}");
                return 1;
            }
        },
        None => Config::default(),
    };

    let state_dir = match env::state_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("silod: {e}");
            return 1;
        }
    };
    if let Err(e) = std::fs::create_dir_all(state_dir.join("logs")) {
        eprintln!("silod: cannot create {}: {e}", state_dir.display());
        return 1;
    }

    // Daily-rotated file log, mirrored to stderr for foreground runs.
    let appender = tracing_appender::rolling::daily(state_dir.join("logs"), "silod.log");
    let (file_writer, _log_guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SILO_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(file_writer.and(std::io::stderr))
        .with_ansi(false)
        .init();

    match config_path {
        Some(path) => info!(config = %path.display(), "configuration loaded"),
        None => info!("no configuration file; using defaults"),
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "cannot start runtime");
            return 1;
        }
    };

    runtime.block_on(async move {
        let startup = match lifecycle::startup(config).await {
            Ok(startup) => startup,
            Err(e) => {
                error!(error = %e, "startup failed");
                return 1;
            }
        };
        let lifecycle::StartupResult { ctx, rpc_listener, instance_lock } = startup;
        spawn_signal_listener(ctx.shutdown.clone());

        lifecycle::run(std::sync::Arc::clone(&ctx), rpc_listener).await;
        drop(instance_lock);
        info!("silod stopped");
        0
    })
}

fn config_path_arg() -> Option<PathBuf> {
    let mut args = std::env::args_os().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" || arg == "-c" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

fn spawn_signal_listener(shutdown: tokio_util::sync::CancellationToken) {
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        let (Ok(mut term), Ok(mut int)) =
            (signal(SignalKind::terminate()), signal(SignalKind::interrupt()))
        else {
            error!("cannot install signal handlers");
            return;
        };
        tokio::select! {
            _ = term.recv() => info!("SIGTERM received"),
            _ = int.recv() => info!("SIGINT received"),
        }
        shutdown.cancel();
    });
}
