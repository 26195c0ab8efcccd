//! Event loop configuration.
//!
//! # Defaults
//!
//! | Field | Default |
//! |-------|---------|
//! | `max_steps` | `Some(1_000_000)` |

/// Configuration for an [`EventLoop`](super::EventLoop).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Maximum number of steps (task polls plus timer firings) a single
    /// driving call may take before it gives up with
    /// [`ErrorKind::StepLimitExceeded`](crate::error::ErrorKind::StepLimitExceeded).
    ///
    /// `None` disables the limit.
    pub max_steps: Option<u64>,
}

impl LoopConfig {
    /// Default step limit per driving call.
    pub const DEFAULT_MAX_STEPS: u64 = 1_000_000;

    /// Creates the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_steps: Some(Self::DEFAULT_MAX_STEPS),
        }
    }

    /// Sets the step limit.
    #[must_use]
    pub const fn max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// Disables the step limit.
    #[must_use]
    pub const fn no_step_limit(mut self) -> Self {
        self.max_steps = None;
        self
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts steps taken by one driving call against the configured limit.
#[derive(Debug)]
pub(crate) struct StepBudget {
    limit: Option<u64>,
    used: u64,
}

impl StepBudget {
    pub(crate) const fn new(limit: Option<u64>) -> Self {
        Self { limit, used: 0 }
    }

    pub(crate) fn tick(&mut self) -> crate::error::Result<()> {
        self.used += 1;
        match self.limit {
            Some(limit) if self.used > limit => Err(crate::error::Error::step_limit_exceeded(limit)),
            _ => Ok(()),
        }
    }
}
