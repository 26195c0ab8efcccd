//! Stale-call suppression.
//!
//! [`StaleCallGuard`] wraps an async function. Every call takes a ticket from
//! a shared [`Generation`] counter before the work starts. When the work
//! completes, the result counts only if no newer call has been issued since;
//! otherwise it is reported as [`Freshness::Stale`] and the caller's effect is
//! skipped.
//!
//! The in-flight work of a superseded call is not cancelled. It runs to
//! completion; only its effect is suppressed.
//!
//! # Errors from stale calls
//!
//! Staleness gates the success effect only. [`StaleCallGuard::try_call`]
//! returns an error to the caller that issued the call even when that call
//! has been superseded, so no failure is ever silently swallowed.

use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use tracing::debug;

/// A monotonically increasing generation counter.
///
/// Cloning yields another handle to the same counter.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    counter: Rc<Cell<u64>>,
}

impl Generation {
    /// Creates a counter at generation zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the counter and returns a ticket for the new generation.
    #[must_use]
    pub fn issue(&self) -> Ticket {
        let id = self.counter.get() + 1;
        self.counter.set(id);
        Ticket {
            id,
            counter: Rc::clone(&self.counter),
        }
    }

    /// Returns the most recently issued generation (zero if none).
    #[must_use]
    pub fn current(&self) -> u64 {
        self.counter.get()
    }
}

/// A captured generation.
#[derive(Clone)]
pub struct Ticket {
    id: u64,
    counter: Rc<Cell<u64>>,
}

impl Ticket {
    /// Returns the generation this ticket was issued for.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Returns true if no newer ticket has been issued.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.counter.get() == self.id
    }
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticket")
            .field("id", &self.id)
            .field("current", &self.is_current())
            .finish()
    }
}

/// The result of a guarded call, tagged with whether it is still the latest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness<T> {
    /// No newer call was issued before this one completed.
    Current(T),
    /// A newer call was issued; the result should be ignored.
    Stale(T),
}

impl<T> Freshness<T> {
    /// Returns true for [`Freshness::Current`].
    #[must_use]
    pub const fn is_current(&self) -> bool {
        matches!(self, Self::Current(_))
    }

    /// Returns the value if it is current.
    pub fn current(self) -> Option<T> {
        match self {
            Self::Current(value) => Some(value),
            Self::Stale(_) => None,
        }
    }

    /// Returns the value regardless of freshness.
    pub fn into_inner(self) -> T {
        match self {
            Self::Current(value) | Self::Stale(value) => value,
        }
    }
}

/// Wraps an async function so only the latest call's result takes effect.
///
/// # Example
///
/// ```
/// use pacer::guard::{Freshness, StaleCallGuard};
/// use pacer::runtime::EventLoop;
/// use std::time::Duration;
///
/// let lp = EventLoop::virtual_time();
/// let handle = lp.handle();
/// let guard = StaleCallGuard::new(move |(query, delay_ms): (&'static str, u64)| {
///     let handle = handle.clone();
///     async move {
///         handle.sleep(Duration::from_millis(delay_ms)).await;
///         query
///     }
/// });
///
/// let slow = guard.call(("ru", 300));
/// let fast = guard.call(("rust", 50));
/// let (slow, fast) = lp
///     .block_on(futures_lite::future::zip(slow, fast))
///     .unwrap();
/// assert_eq!(slow, Freshness::Stale("ru"));
/// assert_eq!(fast, Freshness::Current("rust"));
/// ```
pub struct StaleCallGuard<F> {
    func: Rc<F>,
    generation: Generation,
}

impl<F> StaleCallGuard<F> {
    /// Wraps `func`.
    pub fn new(func: F) -> Self {
        Self {
            func: Rc::new(func),
            generation: Generation::new(),
        }
    }

    /// Returns the guard's generation counter.
    #[must_use]
    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    /// Calls the wrapped function and tags its output with its freshness.
    ///
    /// The ticket is taken when `call` is invoked, not when the returned
    /// future is first polled.
    pub fn call<I, Fut>(&self, input: I) -> impl Future<Output = Freshness<Fut::Output>>
    where
        F: Fn(I) -> Fut,
        Fut: Future,
    {
        let ticket = self.generation.issue();
        let work = (self.func)(input);
        async move {
            let output = work.await;
            if ticket.is_current() {
                Freshness::Current(output)
            } else {
                debug!(ticket = ticket.id(), "discarding stale result");
                Freshness::Stale(output)
            }
        }
    }

    /// Calls the wrapped function and runs `effect` on its output only if the
    /// call is still the latest when it completes.
    ///
    /// Resolves to true if the effect ran.
    pub fn call_then<I, Fut, E>(&self, input: I, effect: E) -> impl Future<Output = bool>
    where
        F: Fn(I) -> Fut,
        Fut: Future,
        E: FnOnce(Fut::Output),
    {
        let call = self.call(input);
        async move {
            match call.await {
                Freshness::Current(output) => {
                    effect(output);
                    true
                }
                Freshness::Stale(_) => false,
            }
        }
    }

    /// Calls a fallible function. Success is tagged with its freshness;
    /// errors are returned to this call's caller whether or not it is stale.
    pub fn try_call<I, Fut, T, E>(&self, input: I) -> impl Future<Output = Result<Freshness<T>, E>>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let call = self.call(input);
        async move {
            match call.await {
                Freshness::Current(Ok(value)) => Ok(Freshness::Current(value)),
                Freshness::Stale(Ok(value)) => Ok(Freshness::Stale(value)),
                Freshness::Current(Err(err)) | Freshness::Stale(Err(err)) => Err(err),
            }
        }
    }
}

impl<F> Clone for StaleCallGuard<F> {
    fn clone(&self) -> Self {
        Self {
            func: Rc::clone(&self.func),
            generation: self.generation.clone(),
        }
    }
}

impl<F> fmt::Debug for StaleCallGuard<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaleCallGuard")
            .field("generation", &self.generation.current())
            .finish_non_exhaustive()
    }
}
