// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backoff shape for retryable failures: exponential growth from a base
//! delay, capped, with full jitter applied per attempt.

use crate::config::RetryConfig;
use crate::error::ErrorKind;
use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self { base_delay, max_delay, max_attempts }
    }

    /// Same shape, different attempt ceiling (per-service overrides).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Deterministic backoff ceiling for the given 1-based attempt:
    /// `base * 2^(attempt-1)`, capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        let scaled = self.base_delay.saturating_mul(1u32 << exp);
        scaled.min(self.max_delay)
    }

    /// Full-jitter delay: uniform in `[0, backoff(attempt)]`.
    pub fn jittered(&self, attempt: u32) -> Duration {
        let ceiling = self.backoff(attempt);
        if ceiling.is_zero() {
            return ceiling;
        }
        let ms = rand::rng().random_range(0..=ceiling.as_millis() as u64);
        Duration::from_millis(ms)
    }

    /// Whether another attempt is allowed after `attempts` tries of an
    /// operation that failed with `kind`. `UpstreamProtocolError` is
    /// retried once regardless of the configured ceiling.
    pub fn allows(&self, kind: ErrorKind, attempts: u32) -> bool {
        if !kind.is_retryable() {
            return false;
        }
        let ceiling = match kind {
            ErrorKind::UpstreamProtocol => self.max_attempts.min(2),
            _ => self.max_attempts,
        };
        attempts < ceiling
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            base_delay: Duration::from_secs_f64(config.base_delay),
            max_delay: Duration::from_secs_f64(config.max_delay),
            max_attempts: config.max_attempts,
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
