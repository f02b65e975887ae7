// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction so retry, heartbeat, and lock-staleness logic can be
//! tested without sleeping.

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of both monotonic and wallclock time.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Monotonic instant, for elapsed-time comparisons.
    fn now(&self) -> Instant;

    /// Wallclock time in UTC, for timestamps written to disk or the wire.
    fn utc(&self) -> DateTime<Utc>;

    /// Milliseconds since the Unix epoch.
    fn epoch_ms(&self) -> u64 {
        self.utc().timestamp_millis().max(0) as u64
    }
}

/// Real system clock.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Controllable clock for tests. Both time sources advance together.
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeInner>>,
}

struct FakeInner {
    instant: Instant,
    utc: DateTime<Utc>,
}

impl FakeClock {
    pub fn new() -> Self {
        // Fixed epoch so timestamps in test output are stable.
        let utc = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default();
        Self { inner: Arc::new(Mutex::new(FakeInner { instant: Instant::now(), utc })) }
    }

    /// Advance both the monotonic and wallclock time.
    pub fn advance(&self, by: Duration) {
        let mut inner = self.inner.lock();
        inner.instant += by;
        inner.utc += chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.inner.lock().instant
    }

    fn utc(&self) -> DateTime<Utc> {
        self.inner.lock().utc
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
