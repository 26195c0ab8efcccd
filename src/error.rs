//! Error types for Pacer.
//!
//! Errors fall into three groups:
//!
//! - **Usage**: the caller handed the toolkit something it cannot work with
//!   (a zero concurrency limit, an unparseable configuration value). These
//!   are reported synchronously at construction time.
//! - **Scheduler**: the event loop cannot make progress (nothing runnable and
//!   nothing scheduled while a future is still pending) or exceeded its step
//!   limit.
//! - **Internal**: a broken invariant inside the crate.
//!
//! Errors raised by caller-supplied callables are never converted into this
//! type. Debounce and throttle let panics unwind to the driving call,
//! [`TaskRunner`](crate::runner::TaskRunner) isolates task failures, and the
//! combinators hand the caller's own error values back unchanged.

use core::fmt;
use std::sync::Arc;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // === Usage ===
    /// A concurrency limit of zero (or otherwise unusable) was supplied.
    InvalidConcurrency,
    /// A configuration value could not be parsed or failed validation.
    InvalidConfig,

    // === Scheduler ===
    /// The event loop ran out of work while the driven future was pending.
    Stalled,
    /// The event loop exceeded its configured step limit.
    StepLimitExceeded,

    // === Internal ===
    /// Internal error (bug).
    Internal,
}

impl ErrorKind {
    /// Returns the error category for this kind.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidConcurrency | Self::InvalidConfig => ErrorCategory::Usage,
            Self::Stalled | Self::StepLimitExceeded => ErrorCategory::Scheduler,
            Self::Internal => ErrorCategory::Internal,
        }
    }
}

/// High-level error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Caller misuse, detected at construction or load time.
    Usage,
    /// The host event loop could not make progress.
    Scheduler,
    /// Invariant violation inside the crate.
    Internal,
}

/// The main error type for Pacer operations.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Adds a message description to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Creates an invalid concurrency error for the rejected limit.
    #[must_use]
    pub fn invalid_concurrency(limit: usize) -> Self {
        Self::new(ErrorKind::InvalidConcurrency)
            .with_message(format!("concurrency limit must be at least 1, got {limit}"))
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidConfig).with_message(detail)
    }

    /// Creates a stalled-loop error.
    #[must_use]
    pub fn stalled(pending_tasks: usize) -> Self {
        Self::new(ErrorKind::Stalled).with_message(format!(
            "no runnable task and no pending timer; {pending_tasks} task(s) still suspended"
        ))
    }

    /// Creates a step limit error.
    #[must_use]
    pub fn step_limit_exceeded(limit: u64) -> Self {
        Self::new(ErrorKind::StepLimitExceeded)
            .with_message(format!("event loop exceeded {limit} steps in one run"))
    }

    /// Creates an internal error (bug).
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal).with_message(detail)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

/// A specialized Result type for Pacer operations.
pub type Result<T> = std::result::Result<T, Error>;
