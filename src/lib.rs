//! Pacer: rate limiting and concurrency control for single-threaded async code.
//!
//! # Overview
//!
//! Pacer bundles the small coordination tools an event-driven program keeps
//! rewriting: collapsing bursts of calls, capping call rates, discarding
//! results that a newer request has superseded, bounding how many jobs run at
//! once, and joining or racing groups of futures. Everything runs on one
//! thread against a [`Scheduler`](runtime::Scheduler), so state lives in
//! `Rc`/`RefCell` and callbacks never need to be `Send`.
//!
//! # Core Guarantees
//!
//! - **Deterministic time**: every timer goes through the scheduler, and the
//!   built-in [`EventLoop`](runtime::EventLoop) can run on a virtual clock
//! - **No lost cleanup**: dropping a debounce or throttle cancels its pending
//!   timer; dropping a combinator drops its inputs
//! - **Isolated failures**: a failing or panicking job never stops a
//!   [`TaskRunner`](runner::TaskRunner) from draining its queue
//! - **Order preservation**: joins report results in input order
//!
//! # Module Structure
//!
//! - [`types`]: Core types ([`Time`])
//! - [`time`]: Clocks, the timer queue, sleep and timeout
//! - [`runtime`]: The scheduler trait and the event loop
//! - [`limiter`]: Debounce and throttle
//! - [`guard`]: Stale-call guard
//! - [`runner`]: Bounded task runner
//! - [`combinator`]: `all`, `all_settled`, `race`, `any`
//! - [`config`]: Toolkit configuration with env and file overrides
//! - [`error`]: Error types
//! - [`test_utils`]: Logging and virtual-time helpers for tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_inception)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]

pub mod combinator;
pub mod config;
pub mod error;
pub mod guard;
pub mod limiter;
pub mod runner;
pub mod runtime;
pub mod test_utils;
pub mod time;
pub mod types;

// Re-exports for convenient access to core types
pub use combinator::{all, all_settled, any, race, AggregateError, Settled};
pub use config::PacerConfig;
pub use error::{Error, ErrorCategory, ErrorKind, Result};
pub use guard::{Freshness, StaleCallGuard};
pub use limiter::{Debounce, DebounceOptions, Throttle, ThrottleOptions};
pub use runner::{TaskFailure, TaskId, TaskRunner};
pub use runtime::{EventLoop, Handle, Scheduler};
pub use types::Time;
