//! Clocks the event loop reads and moves time through.
//!
//! The event loop never calls `Instant::now()` or `thread::sleep` directly.
//! It goes through a [`TimeSource`], so the same debounce, throttle, and
//! runner code runs against real time in production and against a
//! [`VirtualClock`] in tests.

use crate::types::Time;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Time source abstraction for reading and waiting on the current time.
pub trait TimeSource: Send + Sync + fmt::Debug {
    /// Returns the current time.
    fn now(&self) -> Time;

    /// Blocks (or jumps) until `deadline` has been reached.
    ///
    /// Called by the event loop only when no task is runnable and the next
    /// timer lies in the future.
    fn wait_until(&self, deadline: Time);
}

/// Wall clock time source for production use.
///
/// The epoch is the instant this clock was created.
#[derive(Debug)]
pub struct WallClock {
    epoch: Instant,
}

impl WallClock {
    /// Creates a new wall clock time source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for WallClock {
    fn now(&self) -> Time {
        let nanos = u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX);
        Time::from_nanos(nanos)
    }

    fn wait_until(&self, deadline: Time) {
        let remaining = deadline.duration_since(self.now());
        if remaining > 0 {
            std::thread::sleep(Duration::from_nanos(remaining));
        }
    }
}

/// Virtual time source for deterministic tests.
///
/// Time only moves when told to. [`wait_until`](TimeSource::wait_until)
/// jumps straight to the deadline, so a test that "waits" a minute finishes
/// instantly.
///
/// # Example
///
/// ```
/// use pacer::time::{TimeSource, VirtualClock};
/// use pacer::types::Time;
/// use std::time::Duration;
///
/// let clock = VirtualClock::new();
/// assert_eq!(clock.now(), Time::ZERO);
///
/// clock.advance(Duration::from_secs(1));
/// assert_eq!(clock.now(), Time::from_secs(1));
/// ```
#[derive(Debug)]
pub struct VirtualClock {
    now: AtomicU64,
}

impl VirtualClock {
    /// Creates a new virtual clock starting at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: AtomicU64::new(0),
        }
    }

    /// Creates a virtual clock starting at the given time.
    #[must_use]
    pub fn starting_at(time: Time) -> Self {
        Self {
            now: AtomicU64::new(time.as_nanos()),
        }
    }

    /// Advances time by the given duration.
    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        let _ = self
            .now
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(nanos))
            });
    }

    /// Advances time to the given absolute time.
    ///
    /// If the target time is in the past, this is a no-op.
    pub fn advance_to(&self, time: Time) {
        self.now.fetch_max(time.as_nanos(), Ordering::AcqRel);
    }

    /// Sets the current time, which may move the clock backwards.
    pub fn set(&self, time: Time) {
        self.now.store(time.as_nanos(), Ordering::Release);
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for VirtualClock {
    fn now(&self) -> Time {
        Time::from_nanos(self.now.load(Ordering::Acquire))
    }

    fn wait_until(&self, deadline: Time) {
        self.advance_to(deadline);
    }
}
