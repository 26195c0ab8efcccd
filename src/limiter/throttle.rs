//! Throttle: run a callback at most once per window.
//!
//! The first call of a window fires immediately (leading edge). Calls made
//! while the window is still open only record their arguments; one timer is
//! armed for the end of the window and replays the latest arguments there
//! (trailing edge).
//!
//! With `leading` disabled, the first call of a fresh window does not fire;
//! it starts the window, so the trailing edge governs firing. With both
//! edges disabled that first call is dropped too, and only a call made once a
//! full window has passed fires. A clock that moved backwards since the last
//! firing counts as an elapsed window.
//!
//! There is no cancellation. Dropping the last handle to a throttle disarms
//! its trailing timer.

use crate::runtime::{Handle, Scheduler};
use crate::time::TimerHandle;
use crate::types::Time;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;
use tracing::{trace, trace_span, warn, Span};

/// Throttle configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleOptions {
    /// Window length.
    pub wait: Duration,
    /// Fire on the first call of a window.
    pub leading: bool,
    /// Fire at the end of a window with the latest arguments.
    pub trailing: bool,
}

impl ThrottleOptions {
    /// Default window length.
    pub const DEFAULT_WAIT: Duration = Duration::from_millis(100);

    /// Throttle with both edges enabled and the given window.
    #[must_use]
    pub const fn new(wait: Duration) -> Self {
        Self {
            wait,
            leading: true,
            trailing: true,
        }
    }

    /// Sets whether the leading edge fires.
    #[must_use]
    pub const fn leading(mut self, leading: bool) -> Self {
        self.leading = leading;
        self
    }

    /// Sets whether the trailing edge fires.
    #[must_use]
    pub const fn trailing(mut self, trailing: bool) -> Self {
        self.trailing = trailing;
        self
    }
}

impl Default for ThrottleOptions {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WAIT)
    }
}

struct ThrottleState<A> {
    last_invoked: Option<Time>,
    timer: Option<TimerHandle>,
    latest_args: Option<A>,
}

struct Inner<A, S: Scheduler> {
    options: ThrottleOptions,
    scheduler: S,
    callback: RefCell<Box<dyn FnMut(A)>>,
    state: RefCell<ThrottleState<A>>,
    span: Span,
}

impl<A, S: Scheduler> Inner<A, S> {
    fn invoke(&self, args: A, edge: &'static str) {
        let Ok(mut callback) = self.callback.try_borrow_mut() else {
            warn!(parent: &self.span, edge, "re-entrant throttle firing dropped");
            return;
        };
        trace!(parent: &self.span, edge, "throttle fired");
        (*callback)(args);
    }
}

impl<A, S: Scheduler> Drop for Inner<A, S> {
    fn drop(&mut self) {
        if let Some(timer) = self.state.get_mut().timer.take() {
            self.scheduler.cancel(timer);
        }
    }
}

/// Outcome of recording one call against the window.
enum Step<A> {
    Fire(A),
    Deferred,
    Suppressed,
}

/// A throttled callback.
///
/// # Example
///
/// ```
/// use pacer::limiter::{Throttle, ThrottleOptions};
/// use pacer::runtime::EventLoop;
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use std::time::Duration;
///
/// let lp = EventLoop::virtual_time();
/// let fired = Rc::new(Cell::new(0));
/// let counter = Rc::clone(&fired);
/// let on_scroll = Throttle::new(
///     lp.handle(),
///     ThrottleOptions::new(Duration::from_millis(200)),
///     move |_offset: u32| counter.set(counter.get() + 1),
/// );
///
/// on_scroll.call(10); // leading edge
/// on_scroll.call(20);
/// on_scroll.call(30); // replayed on the trailing edge
/// lp.run_until_idle().unwrap();
/// assert_eq!(fired.get(), 2);
/// ```
pub struct Throttle<A, S: Scheduler = Handle> {
    inner: Rc<Inner<A, S>>,
}

impl<A: 'static, S: Scheduler> Throttle<A, S> {
    /// Wraps `callback` in a throttle driven by `scheduler`.
    pub fn new<F>(scheduler: S, options: ThrottleOptions, callback: F) -> Self
    where
        F: FnMut(A) + 'static,
    {
        let span = trace_span!(
            "throttle",
            wait_ms = options.wait.as_millis(),
            leading = options.leading,
            trailing = options.trailing,
        );
        Self {
            inner: Rc::new(Inner {
                options,
                scheduler,
                callback: RefCell::new(Box::new(callback)),
                state: RefCell::new(ThrottleState {
                    last_invoked: None,
                    timer: None,
                    latest_args: None,
                }),
                span,
            }),
        }
    }

    /// Records a call, firing now if the window allows it.
    pub fn call(&self, args: A) {
        let inner = &self.inner;
        let now = inner.scheduler.now();
        let step = {
            let mut state = inner.state.borrow_mut();
            if state.last_invoked.is_none() && !inner.options.leading {
                state.last_invoked = Some(now);
            }
            let elapsed = state
                .last_invoked
                .map(|last| now.checked_duration_since(last));
            let remaining = match elapsed {
                // Never fired, or the clock went backwards.
                None | Some(None) => None,
                Some(Some(elapsed)) => inner.options.wait.checked_sub(elapsed).filter(|r| !r.is_zero()),
            };
            match remaining {
                None => {
                    if let Some(timer) = state.timer.take() {
                        inner.scheduler.cancel(timer);
                    }
                    state.latest_args = None;
                    state.last_invoked = Some(now);
                    Step::Fire(args)
                }
                Some(remaining) if inner.options.trailing => {
                    state.latest_args = Some(args);
                    if state.timer.is_none() {
                        state.timer = Some(Self::arm(inner, remaining));
                    }
                    Step::Deferred
                }
                Some(_) => Step::Suppressed,
            }
        };
        match step {
            Step::Fire(args) => inner.invoke(args, "leading"),
            Step::Deferred => trace!(parent: &inner.span, "throttle deferred to trailing edge"),
            Step::Suppressed => trace!(parent: &inner.span, "throttle suppressed call"),
        }
    }

    /// Returns true if a trailing firing is scheduled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.state.borrow().timer.is_some()
    }

    /// Returns the options this throttle was built with.
    #[must_use]
    pub fn options(&self) -> ThrottleOptions {
        self.inner.options
    }

    fn arm(inner: &Rc<Inner<A, S>>, delay: Duration) -> TimerHandle {
        let weak = Rc::downgrade(inner);
        inner
            .scheduler
            .schedule(delay, Box::new(move || Self::on_timer(&weak)))
    }

    fn on_timer(weak: &Weak<Inner<A, S>>) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let args = {
            let mut state = inner.state.borrow_mut();
            state.timer = None;
            state.last_invoked = if inner.options.leading {
                Some(inner.scheduler.now())
            } else {
                None
            };
            state.latest_args.take()
        };
        if let Some(args) = args {
            inner.invoke(args, "trailing");
        }
    }
}

impl<A, S: Scheduler> Clone for Throttle<A, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A, S: Scheduler> fmt::Debug for Throttle<A, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Throttle")
            .field("options", &self.inner.options)
            .field("last_invoked", &state.last_invoked)
            .field("pending", &state.timer.is_some())
            .finish()
    }
}
