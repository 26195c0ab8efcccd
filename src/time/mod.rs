//! Time primitives: clocks, the timer queue, sleep, and timeout.
//!
//! # Core Types
//!
//! - [`TimeSource`]: how the event loop reads and waits on time
//! - [`WallClock`] / [`VirtualClock`]: production and deterministic clocks
//! - [`TimerQueue`]: deadline-ordered one-shot callbacks
//! - [`Sleep`]: a future that completes at a deadline
//! - [`Timeout`]: races a future against a deadline
//! - [`Elapsed`]: error returned when a timeout expires

mod clock;
mod elapsed;
mod sleep;
mod timeout;
mod timer_queue;

pub use clock::{TimeSource, VirtualClock, WallClock};
pub use elapsed::Elapsed;
pub use sleep::{sleep, sleep_until, Sleep};
pub use timeout::{timeout, timeout_at, Timeout};
pub use timer_queue::{TimerCallback, TimerHandle, TimerQueue};
