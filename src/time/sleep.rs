//! Sleep future for delaying execution.
//!
//! A [`Sleep`] completes once the scheduler's clock reaches its deadline. On
//! its first pending poll it arms a timer on the scheduler; the timer wakes
//! the most recent waker. Dropping a `Sleep` disarms the timer, so an
//! abandoned sleep never keeps the loop busy.

use crate::runtime::{Handle, Scheduler};
use crate::time::TimerHandle;
use crate::types::Time;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;

#[derive(Debug, Default)]
struct SleepSignal {
    fired: Cell<bool>,
    waker: RefCell<Option<Waker>>,
}

/// A future that completes at a deadline on a [`Scheduler`]'s clock.
///
/// # Cancel Safety
///
/// `Sleep` is cancel-safe. Dropping it disarms its timer and has no other
/// effect.
///
/// # Example
///
/// ```
/// use pacer::runtime::EventLoop;
/// use pacer::time::sleep;
/// use pacer::types::Time;
/// use std::time::Duration;
///
/// let lp = EventLoop::virtual_time();
/// let handle = lp.handle();
/// lp.block_on(sleep(&handle, Duration::from_secs(2))).unwrap();
/// assert_eq!(lp.now(), Time::from_secs(2));
/// ```
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Sleep<S: Scheduler = Handle> {
    scheduler: S,
    deadline: Time,
    timer: Option<TimerHandle>,
    signal: Rc<SleepSignal>,
}

impl<S: Scheduler> Sleep<S> {
    /// Creates a `Sleep` that completes at `deadline`.
    pub fn until(scheduler: S, deadline: Time) -> Self {
        Self {
            scheduler,
            deadline,
            timer: None,
            signal: Rc::new(SleepSignal::default()),
        }
    }

    /// Creates a `Sleep` that completes `duration` from now.
    pub fn after(scheduler: S, duration: Duration) -> Self {
        let deadline = scheduler.now() + duration;
        Self::until(scheduler, deadline)
    }

    /// Returns the deadline.
    #[must_use]
    pub const fn deadline(&self) -> Time {
        self.deadline
    }

    /// Returns true if the deadline has passed.
    #[must_use]
    pub fn is_elapsed(&self) -> bool {
        self.signal.fired.get() || self.scheduler.now() >= self.deadline
    }

    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            self.scheduler.cancel(timer);
        }
    }
}

// Sleep is never structurally pinned.
impl<S: Scheduler> Unpin for Sleep<S> {}

impl<S: Scheduler> Future for Sleep<S> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        if this.is_elapsed() {
            this.disarm();
            return Poll::Ready(());
        }

        *this.signal.waker.borrow_mut() = Some(cx.waker().clone());
        if this.timer.is_none() {
            let signal = Rc::downgrade(&this.signal);
            let callback = Box::new(move || {
                let Some(signal) = signal.upgrade() else {
                    return;
                };
                signal.fired.set(true);
                let waker = signal.waker.borrow_mut().take();
                if let Some(waker) = waker {
                    waker.wake();
                }
            });
            this.timer = Some(this.scheduler.schedule_at(this.deadline, callback));
        }
        Poll::Pending
    }
}

impl<S: Scheduler> Drop for Sleep<S> {
    fn drop(&mut self) {
        self.disarm();
    }
}

impl<S: Scheduler> fmt::Debug for Sleep<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sleep")
            .field("deadline", &self.deadline)
            .field("armed", &self.timer.is_some())
            .field("fired", &self.signal.fired.get())
            .finish()
    }
}

/// Creates a [`Sleep`] that completes after `duration`.
pub fn sleep<S: Scheduler>(scheduler: &S, duration: Duration) -> Sleep<S> {
    Sleep::after(scheduler.clone(), duration)
}

/// Creates a [`Sleep`] that completes at `deadline`.
pub fn sleep_until<S: Scheduler>(scheduler: &S, deadline: Time) -> Sleep<S> {
    Sleep::until(scheduler.clone(), deadline)
}
