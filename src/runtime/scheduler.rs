//! The host primitives every component is written against.
//!
//! Debounce, throttle, sleep, and the task runner never touch the event loop
//! directly. They take any [`Scheduler`], so a different host (an embedding
//! application's own loop, say) can drive them by implementing four methods.

use crate::time::{TimerCallback, TimerHandle};
use crate::types::Time;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// A boxed, non-`Send` future driven to completion by the scheduler.
pub type LocalFuture = Pin<Box<dyn Future<Output = ()>>>;

/// A cooperative single-threaded scheduler.
///
/// Implementations must never run a callback or poll a task re-entrantly from
/// inside [`schedule_at`](Self::schedule_at),
/// [`spawn_local`](Self::spawn_local), or [`cancel`](Self::cancel): work is
/// always deferred to a later step of the loop.
pub trait Scheduler: Clone + 'static {
    /// Returns the current time on the scheduler's clock.
    fn now(&self) -> Time;

    /// Runs `callback` once the clock reaches `deadline`.
    fn schedule_at(&self, deadline: Time, callback: TimerCallback) -> TimerHandle;

    /// Runs `callback` after `delay` has elapsed.
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let deadline = self.now() + delay;
        self.schedule_at(deadline, callback)
    }

    /// Aborts a timer that has not fired yet.
    ///
    /// Returns true if the timer was still pending.
    fn cancel(&self, timer: TimerHandle) -> bool;

    /// Queues a future to be polled on the scheduler's thread.
    fn spawn_local(&self, future: LocalFuture);
}
