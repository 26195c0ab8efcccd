//! Error returned when a [`Timeout`](super::Timeout) expires.

use crate::types::Time;

/// The deadline of a [`Timeout`](super::Timeout) passed before the wrapped
/// operation settled. The operation was dropped without producing a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deadline has elapsed at {deadline}")]
pub struct Elapsed {
    deadline: Time,
}

impl Elapsed {
    /// Creates a new `Elapsed` error with the given deadline.
    #[must_use]
    pub const fn new(deadline: Time) -> Self {
        Self { deadline }
    }

    /// Returns the deadline that was exceeded.
    #[must_use]
    pub const fn deadline(&self) -> Time {
        self.deadline
    }
}
