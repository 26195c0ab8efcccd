//! Rate-limiting wrappers over a caller-supplied callback.
//!
//! - [`Debounce`]: collapse a burst of calls into one firing after a quiet
//!   period.
//! - [`Throttle`]: fire at most once per window.
//!
//! Both wrappers own their state privately (pending timer, captured
//! arguments, last firing time) and never suspend: they only schedule timers
//! on the [`Scheduler`](crate::runtime::Scheduler) they were built with.
//! Arguments are a single typed value per wrapper; use a tuple or struct for
//! several.

mod debounce;
mod throttle;

pub use debounce::{Debounce, DebounceOptions};
pub use throttle::{Throttle, ThrottleOptions};
