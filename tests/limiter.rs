//! Debounce and throttle behavior on a virtual clock.
//!
//! # Properties Tested
//!
//! - Debounce collapses a burst into one trailing call with the last arguments
//! - Debounce cancel drops the pending call
//! - Debounce leading edge fires synchronously once per burst
//! - Throttle keeps a sustained stream under its firing ceiling
//! - Randomized bursts match a reference model of burst boundaries

#![allow(missing_docs)]

mod common;

use common::*;
use pacer::limiter::{Debounce, DebounceOptions, Throttle, ThrottleOptions};
use pacer::runtime::EventLoop;
use pacer::PacerConfig;
use proptest::prelude::*;
use std::time::Duration;

fn init_test(test_name: &str) {
    init_test_logging();
    test_phase!(test_name);
}

fn debounced(lp: &EventLoop, options: DebounceOptions) -> (Debounce<u32>, CallLog<u32>) {
    let log = CallLog::new();
    let debounce = Debounce::new(lp.handle(), options, log.recorder(clock_of(&lp.handle())));
    (debounce, log)
}

fn throttled(lp: &EventLoop, options: ThrottleOptions) -> (Throttle<u32>, CallLog<u32>) {
    let log = CallLog::new();
    let throttle = Throttle::new(lp.handle(), options, log.recorder(clock_of(&lp.handle())));
    (throttle, log)
}

/// Issues one call per entry of `gaps`, advancing the clock by the gap after
/// each call, then drains the loop.
fn drive(lp: &EventLoop, gaps: &[u64], mut call: impl FnMut(u32)) {
    for (value, gap) in gaps.iter().enumerate() {
        call(value as u32);
        lp.advance(Duration::from_millis(*gap)).unwrap();
    }
    lp.run_until_idle().unwrap();
}

// ============================================================================
// Debounce
// ============================================================================

#[test]
fn debounce_collapses_burst_into_single_trailing_call() {
    init_test("debounce_collapses_burst_into_single_trailing_call");
    let lp = virtual_loop();
    let (debounce, log) = debounced(&lp, DebounceOptions::new(Duration::from_millis(100)));

    test_section!("ten calls, 10ms apart");
    for value in 0..10 {
        debounce.call(value);
        if value < 9 {
            lp.advance(Duration::from_millis(10)).unwrap();
        }
    }
    assert_with_log!(log.is_empty(), "nothing fired during burst", 0, log.len());

    test_section!("quiet period");
    lp.run_until_idle().unwrap();
    assert_with_log!(log.args() == vec![9], "last call's args", vec![9], log.args());
    // Last call at 90ms.
    assert_with_log!(log.times_ms() == vec![190], "100ms after last call", vec![190], log.times_ms());
    test_complete!("debounce_collapses_burst_into_single_trailing_call");
}

#[test]
fn debounce_cancel_before_timer_prevents_invocation() {
    init_test("debounce_cancel_before_timer_prevents_invocation");
    let lp = virtual_loop();
    let (debounce, log) = debounced(&lp, DebounceOptions::new(Duration::from_millis(100)));
    debounce.call(1);
    lp.advance(Duration::from_millis(50)).unwrap();
    debounce.call(2);
    lp.advance(Duration::from_millis(50)).unwrap();
    assert_with_log!(debounce.is_pending(), "still pending", true, debounce.is_pending());

    let cancelled = debounce.cancel();
    assert_with_log!(cancelled, "cancel reports pending call", true, cancelled);
    lp.advance(Duration::from_secs(1)).unwrap();
    assert_with_log!(log.is_empty(), "zero invocations", 0, log.len());
    let again = debounce.cancel();
    assert_with_log!(!again, "second cancel is a no-op", false, again);
    test_complete!("debounce_cancel_before_timer_prevents_invocation");
}

#[test]
fn debounce_leading_fires_synchronously_once_per_burst() {
    init_test("debounce_leading_fires_synchronously_once_per_burst");
    let lp = virtual_loop();
    let options = DebounceOptions::new(Duration::from_millis(100))
        .leading(true)
        .trailing(false);
    let (debounce, log) = debounced(&lp, options);

    test_section!("first burst");
    debounce.call(1);
    assert_with_log!(log.args() == vec![1], "first call fires before returning", vec![1], log.args());
    debounce.call(2);
    debounce.call(3);
    assert_with_log!(log.len() == 1, "immediate follow-ups suppressed", 1, log.len());

    test_section!("second burst after quiet period");
    lp.advance(Duration::from_millis(100)).unwrap();
    debounce.call(4);
    assert_with_log!(log.args() == vec![1, 4], "new burst fires again", vec![1, 4], log.args());
    assert_with_log!(log.times_ms() == vec![0, 100], "fire times", vec![0, 100], log.times_ms());
    test_complete!("debounce_leading_fires_synchronously_once_per_burst");
}

#[test]
fn debounce_leading_and_trailing_report_both_edges() {
    init_test("debounce_leading_and_trailing_report_both_edges");
    let lp = virtual_loop();
    let options = DebounceOptions::new(Duration::from_millis(100)).leading(true);
    let (debounce, log) = debounced(&lp, options);
    drive(&lp, &[10, 10, 0], |v| debounce.call(v));
    assert_with_log!(log.args() == vec![0, 2], "leading then last", vec![0, 2], log.args());
    assert_with_log!(log.times_ms() == vec![0, 120], "edge times", vec![0, 120], log.times_ms());
    test_complete!("debounce_leading_and_trailing_report_both_edges");
}

#[test]
fn debounce_built_from_config_uses_configured_wait() {
    init_test("debounce_built_from_config_uses_configured_wait");
    let mut config = PacerConfig::default();
    config
        .apply_overrides_from(|name| (name == "PACER_DEBOUNCE_WAIT_MS").then(|| "250".to_string()))
        .unwrap();
    let lp = virtual_loop();
    let (debounce, log) = debounced(&lp, config.debounce);
    debounce.call(1);
    lp.run_until_idle().unwrap();
    assert_with_log!(log.times_ms() == vec![250], "configured wait", vec![250], log.times_ms());
    test_complete!("debounce_built_from_config_uses_configured_wait");
}

// ============================================================================
// Throttle
// ============================================================================

#[test]
fn throttle_ceiling_over_sustained_stream() {
    init_test("throttle_ceiling_over_sustained_stream");
    let lp = virtual_loop();
    let (throttle, log) = throttled(&lp, ThrottleOptions::new(Duration::from_millis(200)));

    test_section!("calls every 20ms for 1000ms");
    let gaps = vec![20; 50];
    drive(&lp, &gaps, |v| throttle.call(v));

    let times = log.times_ms();
    let ceiling = 1000_usize.div_ceil(200) + 1;
    assert_with_log!(times.len() <= ceiling, "firing ceiling", ceiling, times.len());
    assert_with_log!(times.len() >= 5, "stream keeps firing", 5, times.len());
    for pair in times.windows(2) {
        let gap = pair[1] - pair[0];
        assert_with_log!(gap >= 200, "firings a window apart", 200, gap);
    }
    let last = log.args().last().copied();
    assert_with_log!(last == Some(49), "trailing edge delivers the final call", Some(49), last);
    test_complete!("throttle_ceiling_over_sustained_stream", firings = times.len());
}

#[test]
fn throttle_trailing_uses_latest_arguments() {
    init_test("throttle_trailing_uses_latest_arguments");
    let lp = virtual_loop();
    let (throttle, log) = throttled(&lp, ThrottleOptions::new(Duration::from_millis(100)));
    drive(&lp, &[10, 10, 10, 10], |v| throttle.call(v));
    assert_with_log!(log.args() == vec![0, 3], "leading then last-write-wins", vec![0, 3], log.args());
    assert_with_log!(log.times_ms() == vec![0, 100], "window boundaries", vec![0, 100], log.times_ms());
    test_complete!("throttle_trailing_uses_latest_arguments");
}

#[test]
fn throttle_backwards_clock_reopens_window() {
    init_test("throttle_backwards_clock_reopens_window");
    let (lp, clock) = virtual_loop_with_clock();
    clock.set(pacer::Time::from_secs(60));
    let options = ThrottleOptions::new(Duration::from_secs(10)).trailing(false);
    let (throttle, log) = throttled(&lp, options);
    throttle.call(1);
    throttle.call(2);
    clock.set(pacer::Time::from_secs(30));
    throttle.call(3);
    assert_with_log!(log.args() == vec![1, 3], "skewed clock fires", vec![1, 3], log.args());
    test_complete!("throttle_backwards_clock_reopens_window");
}

// ============================================================================
// Property tests
// ============================================================================

const WAIT_MS: u64 = 100;

/// Expected debounce firings `(value, time_ms)` for calls separated by `gaps`.
fn debounce_model(gaps: &[u64]) -> Vec<(u32, u64)> {
    let mut fired = Vec::new();
    let mut now = 0;
    for (value, gap) in gaps.iter().enumerate() {
        let is_last = value + 1 == gaps.len();
        if is_last || *gap >= WAIT_MS {
            fired.push((value as u32, now + WAIT_MS));
        }
        now += gap;
    }
    fired
}

proptest! {
    #![proptest_config(test_proptest_config(64))]

    /// A burst with every gap shorter than the wait fires exactly once, with
    /// the last argument, `wait` after the last call.
    #[test]
    fn debounce_burst_fires_once_with_last_argument(
        gaps in proptest::collection::vec(0..WAIT_MS, 1..30),
    ) {
        init_test_logging();
        let lp = virtual_loop();
        let (debounce, log) = debounced(&lp, DebounceOptions::new(Duration::from_millis(WAIT_MS)));
        let mut burst = gaps.clone();
        *burst.last_mut().unwrap() = 0;
        drive(&lp, &burst, |v| debounce.call(v));

        let last_call: u64 = burst.iter().sum();
        prop_assert_eq!(log.args(), vec![(burst.len() - 1) as u32]);
        prop_assert_eq!(log.times_ms(), vec![last_call + WAIT_MS]);
    }

    /// Arbitrary call patterns fire once per burst, where a gap of at least
    /// `wait` ends a burst.
    #[test]
    fn debounce_matches_burst_model(
        gaps in proptest::collection::vec(0..3 * WAIT_MS, 1..30),
    ) {
        init_test_logging();
        let lp = virtual_loop();
        let (debounce, log) = debounced(&lp, DebounceOptions::new(Duration::from_millis(WAIT_MS)));
        let mut calls = gaps.clone();
        *calls.last_mut().unwrap() = 0;
        drive(&lp, &calls, |v| debounce.call(v));

        let expected = debounce_model(&calls);
        let actual: Vec<(u32, u64)> = log.args().into_iter().zip(log.times_ms()).collect();
        prop_assert_eq!(actual, expected);
    }

    /// Throttle firings are always at least a window apart, and the final
    /// call's arguments are always delivered.
    #[test]
    fn throttle_spacing_and_final_delivery(
        gaps in proptest::collection::vec(0..2 * WAIT_MS, 1..40),
    ) {
        init_test_logging();
        let lp = virtual_loop();
        let (throttle, log) = throttled(&lp, ThrottleOptions::new(Duration::from_millis(WAIT_MS)));
        drive(&lp, &gaps, |v| throttle.call(v));

        let times = log.times_ms();
        for pair in times.windows(2) {
            prop_assert!(pair[1] - pair[0] >= WAIT_MS, "firings too close: {:?}", times);
        }
        prop_assert_eq!(log.args().last().copied(), Some((gaps.len() - 1) as u32));
    }
}
