//! Test utilities for Pacer.
//!
//! This module provides shared helpers for unit and integration tests:
//! - Consistent tracing-based logging initialization
//! - Phase/section macros for readable test output
//! - Virtual-time event loop constructors
//! - A recording callback for limiter tests
//!
//! # Example
//! ```
//! use pacer::test_utils::{init_test_logging, virtual_loop};
//! use std::time::Duration;
//!
//! init_test_logging();
//! let lp = virtual_loop();
//! let handle = lp.handle();
//! lp.block_on(async move { handle.sleep(Duration::from_millis(5)).await })
//!     .unwrap();
//! assert_eq!(lp.now().as_millis(), 5);
//! ```

use crate::runtime::{EventLoop, LoopConfig};
use crate::time::VirtualClock;
use crate::types::Time;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Once};
use tracing_subscriber::fmt::format::FmtSpan;

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Create an event loop on a fresh virtual clock starting at zero.
#[must_use]
pub fn virtual_loop() -> EventLoop {
    EventLoop::virtual_time()
}

/// Create a virtual-time event loop and return its clock for direct control.
///
/// Useful when a test needs to move time backwards with
/// [`VirtualClock::set`].
#[must_use]
pub fn virtual_loop_with_clock() -> (EventLoop, Arc<VirtualClock>) {
    let clock = Arc::new(VirtualClock::new());
    let lp = EventLoop::with_config(LoopConfig::default(), clock.clone());
    (lp, clock)
}

/// Records every invocation of a limiter callback along with the time it ran.
///
/// Clones share the same log.
#[derive(Debug)]
pub struct CallLog<A> {
    calls: Rc<RefCell<Vec<(Time, A)>>>,
}

impl<A> Clone for CallLog<A> {
    fn clone(&self) -> Self {
        Self {
            calls: Rc::clone(&self.calls),
        }
    }
}

impl<A: Clone + 'static> Default for CallLog<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Clone + 'static> CallLog<A> {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Returns a callback that appends `(now(), args)` to the log.
    pub fn recorder<N>(&self, now: N) -> impl FnMut(A) + 'static
    where
        N: Fn() -> Time + 'static,
    {
        let calls = Rc::clone(&self.calls);
        move |args| calls.borrow_mut().push((now(), args))
    }

    /// Returns the recorded arguments in invocation order.
    #[must_use]
    pub fn args(&self) -> Vec<A> {
        self.calls.borrow().iter().map(|(_, a)| a.clone()).collect()
    }

    /// Returns the recorded invocation times in milliseconds.
    #[must_use]
    pub fn times_ms(&self) -> Vec<u64> {
        self.calls.borrow().iter().map(|(t, _)| t.as_millis()).collect()
    }

    /// Returns the number of recorded invocations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.borrow().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.borrow().is_empty()
    }
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log a section within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Log test completion with summary.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            test = %$name,
            $($key = %$value,)*
            "test completed successfully: {}",
            $name
        );
    };
}

/// Log before assertions for context.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}
