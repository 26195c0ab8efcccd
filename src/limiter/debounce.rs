//! Debounce: collapse a burst of calls into one.
//!
//! Every call re-arms a single timer `wait` into the future. When the timer
//! finally fires (no call for `wait`), the callback runs once with the
//! arguments of the last call in the burst.
//!
//! # Edges
//!
//! | `leading` | `trailing` | Behavior for one burst |
//! |-----------|------------|------------------------|
//! | false | true | fires once, `wait` after the last call (default) |
//! | true | false | fires once, synchronously, on the first call |
//! | true | true | fires on the first call, and again after the burst if more calls followed |
//! | false | false | never fires |
//!
//! A single isolated call with both edges enabled fires only the leading
//! edge; there is nothing newer to replay on the trailing edge.
//!
//! # Errors
//!
//! The callback's panics are not caught. A panic on the leading edge unwinds
//! out of [`Debounce::call`]; a panic on the trailing edge unwinds out of the
//! event loop call that fired the timer.

use crate::runtime::{Handle, Scheduler};
use crate::time::TimerHandle;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;
use tracing::{trace, trace_span, warn, Span};

/// Debounce configuration.
///
/// # Example
///
/// ```
/// use pacer::limiter::DebounceOptions;
/// use std::time::Duration;
///
/// let options = DebounceOptions::new(Duration::from_millis(300)).leading(true);
/// assert!(options.leading);
/// assert!(options.trailing);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceOptions {
    /// Quiet period that must pass before the trailing edge fires.
    pub wait: Duration,
    /// Fire on the first call of a burst.
    pub leading: bool,
    /// Fire after the burst with the latest arguments.
    pub trailing: bool,
}

impl DebounceOptions {
    /// Default quiet period.
    pub const DEFAULT_WAIT: Duration = Duration::from_millis(100);

    /// Trailing-only debounce with the given quiet period.
    #[must_use]
    pub const fn new(wait: Duration) -> Self {
        Self {
            wait,
            leading: false,
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

impl Default for DebounceOptions {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WAIT)
    }
}

struct DebounceState<A> {
    timer: Option<TimerHandle>,
    last_args: Option<A>,
}

struct Inner<A, S: Scheduler> {
    options: DebounceOptions,
    scheduler: S,
    callback: RefCell<Box<dyn FnMut(A)>>,
    state: RefCell<DebounceState<A>>,
    span: Span,
}

impl<A, S: Scheduler> Inner<A, S> {
    fn invoke(&self, args: A, edge: &'static str) {
        let Ok(mut callback) = self.callback.try_borrow_mut() else {
            warn!(parent: &self.span, edge, "re-entrant debounce firing dropped");
            return;
        };
        trace!(parent: &self.span, edge, "debounce fired");
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

/// A debounced callback.
///
/// Cloning a `Debounce` yields another handle to the same wrapper state. When
/// the last handle is dropped, any pending trailing call is cancelled.
///
/// # Example
///
/// ```
/// use pacer::limiter::{Debounce, DebounceOptions};
/// use pacer::runtime::EventLoop;
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use std::time::Duration;
///
/// let lp = EventLoop::virtual_time();
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = Rc::clone(&seen);
/// let search = Debounce::new(
///     lp.handle(),
///     DebounceOptions::new(Duration::from_millis(100)),
///     move |query: &'static str| sink.borrow_mut().push(query),
/// );
///
/// search.call("r");
/// search.call("ru");
/// search.call("rust");
/// lp.run_until_idle().unwrap();
/// assert_eq!(*seen.borrow(), vec!["rust"]);
/// ```
pub struct Debounce<A, S: Scheduler = Handle> {
    inner: Rc<Inner<A, S>>,
}

impl<A: 'static, S: Scheduler> Debounce<A, S> {
    /// Wraps `callback` in a debounce driven by `scheduler`.
    pub fn new<F>(scheduler: S, options: DebounceOptions, callback: F) -> Self
    where
        F: FnMut(A) + 'static,
    {
        let span = trace_span!(
            "debounce",
            wait_ms = options.wait.as_millis(),
            leading = options.leading,
            trailing = options.trailing,
        );
        Self {
            inner: Rc::new(Inner {
                options,
                scheduler,
                callback: RefCell::new(Box::new(callback)),
                state: RefCell::new(DebounceState {
                    timer: None,
                    last_args: None,
                }),
                span,
            }),
        }
    }

    /// Records a call.
    ///
    /// Re-arms the trailing timer. On the first call of a burst with
    /// `leading` enabled, the callback runs before this returns.
    pub fn call(&self, args: A) {
        let inner = &self.inner;
        let leading = {
            let mut state = inner.state.borrow_mut();
            let was_idle = match state.timer.take() {
                Some(timer) => {
                    inner.scheduler.cancel(timer);
                    trace!(parent: &inner.span, "debounce collapsed pending call");
                    false
                }
                None => true,
            };
            state.timer = Some(Self::arm(inner));
            if inner.options.leading && was_idle {
                state.last_args = None;
                Some(args)
            } else {
                state.last_args = Some(args);
                None
            }
        };
        if let Some(args) = leading {
            inner.invoke(args, "leading");
        }
    }

    /// Drops any pending call without running it.
    ///
    /// The next call starts a fresh burst. Returns true if a timer was
    /// pending.
    pub fn cancel(&self) -> bool {
        let mut state = self.inner.state.borrow_mut();
        state.last_args = None;
        match state.timer.take() {
            Some(timer) => {
                self.inner.scheduler.cancel(timer);
                trace!(parent: &self.inner.span, "debounce cancelled");
                true
            }
            None => false,
        }
    }

    /// Runs the pending trailing call now instead of waiting for the timer.
    ///
    /// Returns true if the callback ran.
    pub fn flush(&self) -> bool {
        let pending = {
            let mut state = self.inner.state.borrow_mut();
            let Some(timer) = state.timer.take() else {
                return false;
            };
            self.inner.scheduler.cancel(timer);
            state.last_args.take()
        };
        match pending {
            Some(args) if self.inner.options.trailing => {
                self.inner.invoke(args, "flush");
                true
            }
            _ => false,
        }
    }

    /// Returns true if a burst is in progress (the timer is armed).
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.state.borrow().timer.is_some()
    }

    /// Returns the options this debounce was built with.
    #[must_use]
    pub fn options(&self) -> DebounceOptions {
        self.inner.options
    }

    fn arm(inner: &Rc<Inner<A, S>>) -> TimerHandle {
        let weak = Rc::downgrade(inner);
        inner.scheduler.schedule(
            inner.options.wait,
            Box::new(move || Self::on_timer(&weak)),
        )
    }

    fn on_timer(weak: &Weak<Inner<A, S>>) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let args = {
            let mut state = inner.state.borrow_mut();
            state.timer = None;
            let args = state.last_args.take();
            args.filter(|_| inner.options.trailing)
        };
        if let Some(args) = args {
            inner.invoke(args, "trailing");
        }
    }
}

impl<A, S: Scheduler> Clone for Debounce<A, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A, S: Scheduler> fmt::Debug for Debounce<A, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Debounce")
            .field("options", &self.inner.options)
            .field("pending", &state.timer.is_some())
            .field("has_args", &state.last_args.is_some())
            .finish()
    }
}
