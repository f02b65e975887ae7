// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! silo-worker entry point.
//!
//! Protocol with the master: the first framed message on stdin is
//! `MasterMsg::Hello` carrying the config snapshot; stdout carries
//! framed `WorkerEvent`s; SIGTERM (or `MasterMsg::Cancel`) requests a
//! cooperative stop. Exit codes: 0 clean, 1 lock denied, 2 failed,
//! 3 cancelled.

use silo_core::event::{MasterMsg, TerminalStatus, WorkerEvent, PROTOCOL_VERSION};
use silo_remote::facade::RemoteStore;
use silo_worker::{report, run, WorkerContext};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// How long to wait for the master's Hello before giving up.
const HELLO_TIMEOUT: Duration = Duration::from_secs(10);

fn main() {
    // Workers log to stderr; the master owns the log files.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("SILO_LOG").unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "cannot start runtime");
            std::process::exit(TerminalStatus::Failed.exit_code());
        }
    };
    let code = runtime.block_on(worker_main());
    std::process::exit(code);
}

async fn worker_main() -> i32 {
    let directory = match directory_arg() {
        Some(directory) => directory,
        None => {
            error!("usage: silo-worker --directory <path>");
            return TerminalStatus::Failed.exit_code();
        }
    };

    let mut stdin = tokio::io::stdin();
    let hello = tokio::time::timeout(HELLO_TIMEOUT, silo_wire::read_msg::<_, MasterMsg>(&mut stdin));
    let (config, hello_directory) = match hello.await {
        Ok(Ok(Some(MasterMsg::Hello { version, directory, config }))) => {
            if version != PROTOCOL_VERSION {
                error!(ours = PROTOCOL_VERSION, theirs = %version, "protocol version skew");
                return TerminalStatus::Failed.exit_code();
            }
            (config, directory)
        }
        other => {
            error!(?other, "expected MasterMsg::Hello on stdin");
            return TerminalStatus::Failed.exit_code();
        }
    };
    if hello_directory != directory {
        error!(
            arg = %directory.display(),
            hello = %hello_directory.display(),
            "directory mismatch between argv and handshake"
        );
        return TerminalStatus::Failed.exit_code();
    }

    let facade = match RemoteStore::from_config(&config.upstream) {
        Ok(facade) => Arc::new(facade),
        Err(e) => {
            error!(error = %e, "bad upstream configuration");
            return TerminalStatus::Failed.exit_code();
        }
    };

    let cancel = CancellationToken::new();
    spawn_signal_listener(cancel.clone());
    spawn_stdin_listener(stdin, cancel.clone());

    let (events, events_rx) = mpsc::unbounded_channel();
    let pump = tokio::spawn(report::pump_events(events_rx, tokio::io::stdout()));
    let heartbeat_stop = CancellationToken::new();
    let heartbeat = report::spawn_heartbeat(
        events.clone(),
        Duration::from_secs(config.heartbeat.interval),
        heartbeat_stop.clone(),
    );

    let _ = events.send(WorkerEvent::Hello {
        pid: std::process::id(),
        directory: directory.clone(),
        version: PROTOCOL_VERSION.to_string(),
    });
    info!(directory = %directory.display(), "worker starting");

    let status = run(WorkerContext {
        directory,
        config,
        facade,
        cancel,
        events: events.clone(),
    })
    .await;

    // Stop the ticker, drop our sender, and let the pump flush the
    // remaining events (Terminal included) before exiting.
    heartbeat_stop.cancel();
    let _ = heartbeat.await;
    drop(events);
    let _ = pump.await;

    status.exit_code()
}

fn directory_arg() -> Option<PathBuf> {
    let mut args = std::env::args_os().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--directory" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

fn spawn_signal_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(e) => {
                warn!(error = %e, "cannot install SIGTERM handler");
                return;
            }
        };
        let mut int = match signal(SignalKind::interrupt()) {
            Ok(int) => int,
            Err(e) => {
                warn!(error = %e, "cannot install SIGINT handler");
                return;
            }
        };
        tokio::select! {
            _ = term.recv() => info!("SIGTERM received, stopping"),
            _ = int.recv() => info!("SIGINT received, stopping"),
        }
        cancel.cancel();
    });
}

fn spawn_stdin_listener(mut stdin: tokio::io::Stdin, cancel: CancellationToken) {
    tokio::spawn(async move {
        loop {
            match silo_wire::read_msg::<_, MasterMsg>(&mut stdin).await {
                Ok(Some(MasterMsg::Cancel)) => {
                    info!("cancel requested by master");
                    cancel.cancel();
                }
                Ok(Some(MasterMsg::Hello { .. })) => {
                    warn!("unexpected second Hello; ignoring");
                }
                // Master went away: finish the current run on our own.
                Ok(None) | Err(_) => return,
            }
        }
    });
}
