//! The host scheduler.
//!
//! Every component in the crate is written against the [`Scheduler`] trait:
//! a clock, one-shot timers, and local task spawning. [`EventLoop`] is the
//! built-in implementation, a cooperative single-threaded loop that runs on
//! either a wall clock or a virtual clock.

mod config;
mod event_loop;
mod scheduler;
mod task;

pub use config::LoopConfig;
pub use event_loop::{EventLoop, Handle, RunStats};
pub use scheduler::{LocalFuture, Scheduler};
pub use task::JoinHandle;
