#![allow(dead_code)]
#![allow(unused_imports)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```
//! mod common;
//! use common::*;
//! ```

pub use pacer::test_utils::{
    init_test_logging, init_test_logging_with_level, virtual_loop, virtual_loop_with_clock,
    CallLog,
};
pub use pacer::{assert_with_log, test_complete, test_phase, test_section};

use pacer::runtime::{EventLoop, Handle, Scheduler};
use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;
use std::future::Future;
use std::time::Duration;

/// Default seed for property tests when running under CI.
pub const DEFAULT_PROPTEST_SEED: u64 = 0x5EED_5EED;

const PROPTEST_SEED_ENV: &str = "PACER_PROPTEST_SEED";
const PROPTEST_MAX_SHRINK_ITERS_ENV: &str = "PACER_PROPTEST_MAX_SHRINK_ITERS";

/// Configuration for property tests with optional deterministic seed support.
#[derive(Debug, Clone)]
pub struct PropertyTestConfig {
    /// Fixed seed for reproducibility (overrides CI default when set).
    pub seed: Option<u64>,
    /// Number of successful cases required.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl PropertyTestConfig {
    /// Build a config with defaults for property tests.
    #[must_use]
    pub fn new(cases: u32) -> Self {
        Self {
            seed: read_proptest_seed(),
            cases,
            max_shrink_iters: read_max_shrink_iters()
                .unwrap_or(ProptestConfig::default().max_shrink_iters),
        }
    }

    /// Convert into a ProptestConfig, applying deterministic seed rules.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        let mut config = ProptestConfig::with_cases(self.cases);

        // Honor existing PROPTEST_RNG_SEED, otherwise apply our own.
        if matches!(config.rng_seed, RngSeed::Random) {
            if let Some(seed) = self.seed {
                config.rng_seed = RngSeed::Fixed(seed);
            }
        }

        config.max_shrink_iters = self.max_shrink_iters;
        config
    }
}

/// Build a ProptestConfig with deterministic seed support for CI.
#[must_use]
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    PropertyTestConfig::new(cases).to_proptest_config()
}

fn read_proptest_seed() -> Option<u64> {
    if let Ok(value) = std::env::var(PROPTEST_SEED_ENV) {
        return value.parse::<u64>().ok();
    }

    // If CI is set and no explicit seed is provided, use a fixed seed.
    if std::env::var("CI").is_ok() {
        return Some(DEFAULT_PROPTEST_SEED);
    }

    None
}

fn read_max_shrink_iters() -> Option<u32> {
    std::env::var(PROPTEST_MAX_SHRINK_ITERS_ENV)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
}

/// A future that sleeps for `ms` virtual milliseconds, then resolves to
/// `Ok(value)`.
pub fn resolve_after<T: 'static>(
    handle: &Handle,
    ms: u64,
    value: T,
) -> impl Future<Output = Result<T, String>> + 'static {
    let handle = handle.clone();
    async move {
        handle.sleep(Duration::from_millis(ms)).await;
        Ok(value)
    }
}

/// A future that sleeps for `ms` virtual milliseconds, then resolves to
/// `Err(reason)`.
pub fn reject_after<T: 'static>(
    handle: &Handle,
    ms: u64,
    reason: &str,
) -> impl Future<Output = Result<T, String>> + 'static {
    let handle = handle.clone();
    let reason = reason.to_string();
    async move {
        handle.sleep(Duration::from_millis(ms)).await;
        Err(reason)
    }
}

/// Returns the current virtual time of `lp` in milliseconds.
#[must_use]
pub fn now_ms(lp: &EventLoop) -> u64 {
    lp.now().as_millis()
}

/// Returns a closure reading `handle`'s clock, for [`CallLog::recorder`].
pub fn clock_of(handle: &Handle) -> impl Fn() -> pacer::types::Time + 'static {
    let handle = handle.clone();
    move || handle.now()
}
