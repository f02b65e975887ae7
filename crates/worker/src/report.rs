// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event reporting: the framed stdout stream and the heartbeat ticker.

use silo_core::clock::{Clock, SystemClock};
use silo_core::event::WorkerEvent;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// Drain `events` into framed messages on `out`. Runs until the sender
/// side is dropped; the final flush happens per frame.
pub async fn pump_events<W>(mut events: mpsc::UnboundedReceiver<WorkerEvent>, mut out: W)
where
    W: AsyncWrite + Unpin,
{
    while let Some(event) = events.recv().await {
        if let Err(e) = silo_wire::write_msg(&mut out, &event).await {
            // A broken pipe means the master is gone; stop reporting but
            // let the run finish so the lock is still released.
            error!(error = %e, "event stream broken");
            return;
        }
    }
}

/// Emit a heartbeat every `interval` until `shutdown` fires.
pub fn spawn_heartbeat(
    events: mpsc::UnboundedSender<WorkerEvent>,
    interval: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = ticker.tick() => {
                    if events.send(WorkerEvent::Heartbeat { at_ms: SystemClock.epoch_ms() }).is_err() {
                        return;
                    }
                }
            }
        }
    })
}
