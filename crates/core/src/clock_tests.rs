// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[test]
fn fake_clock_advances_both_sources() {
    let clock = FakeClock::new();
    let i0 = clock.now();
    let ms0 = clock.epoch_ms();

    clock.advance(Duration::from_secs(90));

    assert_eq!(clock.now() - i0, Duration::from_secs(90));
    assert_eq!(clock.epoch_ms() - ms0, 90_000);
}

#[test]
fn fake_clock_clones_share_time() {
    let clock = FakeClock::new();
    let other = clock.clone();
    clock.advance(Duration::from_millis(250));
    assert_eq!(other.epoch_ms(), clock.epoch_ms());
}

#[test]
fn system_clock_epoch_is_sane() {
    // After 2023-01-01, before 2100.
    let ms = SystemClock.epoch_ms();
    assert!(ms > 1_672_531_200_000);
    assert!(ms < 4_102_444_800_000);
}
