//! Racing an operation against a timer.
//!
//! The operation is polled before the timer, so an operation that settles in
//! the same turn as the deadline wins.

use super::{Elapsed, Sleep};
use crate::runtime::{Handle, Scheduler};
use crate::types::Time;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

/// A future that yields `Err(Elapsed)` if the wrapped future does not
/// complete before the deadline.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Timeout<F, S: Scheduler = Handle> {
    future: Pin<Box<F>>,
    sleep: Sleep<S>,
}

impl<F, S: Scheduler> Timeout<F, S> {
    /// Returns the deadline.
    #[must_use]
    pub const fn deadline(&self) -> Time {
        self.sleep.deadline()
    }
}

impl<F: Future, S: Scheduler> Future for Timeout<F, S> {
    type Output = Result<F::Output, Elapsed>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Poll::Ready(output) = self.future.as_mut().poll(cx) {
            return Poll::Ready(Ok(output));
        }
        match Pin::new(&mut self.sleep).poll(cx) {
            Poll::Ready(()) => {
                let deadline = self.sleep.deadline();
                tracing::debug!(%deadline, "timeout elapsed");
                Poll::Ready(Err(Elapsed::new(deadline)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<F, S: Scheduler> fmt::Debug for Timeout<F, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeout")
            .field("sleep", &self.sleep)
            .finish_non_exhaustive()
    }
}

/// Requires `future` to complete within `duration`.
///
/// # Example
///
/// ```
/// use pacer::runtime::EventLoop;
/// use pacer::time::timeout;
/// use std::time::Duration;
///
/// let lp = EventLoop::virtual_time();
/// let handle = lp.handle();
/// let slow = handle.sleep(Duration::from_secs(5));
/// let result = lp
///     .block_on(timeout(&handle, Duration::from_secs(1), slow))
///     .unwrap();
/// assert!(result.is_err());
/// ```
pub fn timeout<S: Scheduler, F: Future>(
    scheduler: &S,
    duration: Duration,
    future: F,
) -> Timeout<F, S> {
    Timeout {
        future: Box::pin(future),
        sleep: Sleep::after(scheduler.clone(), duration),
    }
}

/// Requires `future` to complete by `deadline`.
pub fn timeout_at<S: Scheduler, F: Future>(
    scheduler: &S,
    deadline: Time,
    future: F,
) -> Timeout<F, S> {
    Timeout {
        future: Box::pin(future),
        sleep: Sleep::until(scheduler.clone(), deadline),
    }
}
