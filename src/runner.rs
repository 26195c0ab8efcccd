//! Bounded-concurrency task runner.
//!
//! [`TaskRunner`] keeps a FIFO queue of async jobs and runs at most `limit`
//! of them at once. When a running job settles, the next queued job starts.
//! Jobs start in push order; they may finish in any order.
//!
//! # Failure isolation
//!
//! A job that returns `Err` or panics is logged, counted, and recorded as a
//! [`TaskFailure`]. It never reaches the caller of [`TaskRunner::push`] and
//! never stops the queue. Only the most recent failures are kept (see
//! [`TaskRunner::with_failure_history`]); [`RunnerMetrics`] keeps the totals.
//!
//! # Example
//!
//! ```
//! use pacer::runner::TaskRunner;
//! use pacer::runtime::EventLoop;
//! use pacer::types::Time;
//! use std::time::Duration;
//!
//! let lp = EventLoop::virtual_time();
//! let handle = lp.handle();
//! let runner = TaskRunner::new(handle.clone(), 2).unwrap();
//! for _ in 0..5 {
//!     let handle = handle.clone();
//!     runner.push(move || async move {
//!         handle.sleep(Duration::from_millis(100)).await;
//!         Ok::<_, String>(())
//!     });
//! }
//! lp.block_on(runner.idle()).unwrap();
//! assert_eq!(lp.now(), Time::from_millis(300));
//! assert_eq!(runner.metrics().peak_running, 2);
//! ```

use crate::config::PacerConfig;
use crate::error::{Error, Result};
use crate::runtime::{Handle, Scheduler};
use futures_lite::FutureExt;
use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use tracing::{debug, trace, warn};

/// Identifies a job pushed onto a [`TaskRunner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Returns the raw id. Ids count up from 1 in push order.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// A job that did not complete successfully.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskFailure {
    /// The job resolved to `Err`.
    #[error("{id} failed: {message}")]
    Failed {
        /// The failing job.
        id: TaskId,
        /// The error, rendered with `Display`.
        message: String,
    },
    /// The job panicked.
    #[error("{id} panicked: {message}")]
    Panicked {
        /// The panicking job.
        id: TaskId,
        /// The panic payload, if it was a string.
        message: String,
    },
}

impl TaskFailure {
    /// Returns the id of the job that failed.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        match self {
            Self::Failed { id, .. } | Self::Panicked { id, .. } => *id,
        }
    }
}

/// Counters for a [`TaskRunner`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerMetrics {
    /// Jobs pushed.
    pub total_pushed: u64,
    /// Jobs that resolved to `Ok`.
    pub completed: u64,
    /// Jobs that resolved to `Err`.
    pub failed: u64,
    /// Jobs that panicked.
    pub panicked: u64,
    /// Highest number of jobs running at once.
    pub peak_running: usize,
}

type BoxedJob = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = std::result::Result<(), String>>>>>;

struct QueuedJob {
    id: TaskId,
    job: BoxedJob,
}

#[derive(Default)]
struct RunnerState {
    queue: VecDeque<QueuedJob>,
    running: usize,
    next_id: u64,
    metrics: RunnerMetrics,
    failures: VecDeque<TaskFailure>,
    idle_waiters: Vec<Waker>,
}

impl RunnerState {
    fn is_idle(&self) -> bool {
        self.running == 0 && self.queue.is_empty()
    }

    /// Records a failure, evicting the oldest once `history` are held.
    fn record_failure(&mut self, failure: TaskFailure, history: usize) {
        if history == 0 {
            return;
        }
        if self.failures.len() == history {
            self.failures.pop_front();
        }
        self.failures.push_back(failure);
    }
}

struct Inner<S: Scheduler> {
    scheduler: S,
    limit: usize,
    failure_history: usize,
    state: RefCell<RunnerState>,
}

/// Runs queued async jobs with a fixed concurrency ceiling.
///
/// Cloning yields another handle to the same queue.
pub struct TaskRunner<S: Scheduler = Handle> {
    inner: Rc<Inner<S>>,
}

impl<S: Scheduler> TaskRunner<S> {
    /// Creates a runner that runs at most `limit` jobs at once.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidConcurrency`](crate::error::ErrorKind::InvalidConcurrency)
    /// if `limit` is zero.
    pub fn new(scheduler: S, limit: usize) -> Result<Self> {
        Self::with_failure_history(scheduler, limit, PacerConfig::DEFAULT_RUNNER_FAILURE_HISTORY)
    }

    /// Creates a runner that keeps at most `failure_history` failures for
    /// [`take_failures`](Self::take_failures). Older failures are dropped
    /// first; `0` keeps none.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidConcurrency`](crate::error::ErrorKind::InvalidConcurrency)
    /// if `limit` is zero.
    pub fn with_failure_history(scheduler: S, limit: usize, failure_history: usize) -> Result<Self> {
        if limit == 0 {
            return Err(Error::invalid_concurrency(limit));
        }
        debug!(limit, failure_history, "task runner created");
        Ok(Self {
            inner: Rc::new(Inner {
                scheduler,
                limit,
                failure_history,
                state: RefCell::new(RunnerState::default()),
            }),
        })
    }

    /// Creates a runner with the configured concurrency and failure history.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidConcurrency`](crate::error::ErrorKind::InvalidConcurrency)
    /// if the configured concurrency is zero.
    pub fn from_config(scheduler: S, config: &PacerConfig) -> Result<Self> {
        Self::with_failure_history(scheduler, config.runner_concurrency, config.runner_failure_history)
    }

    /// Appends a job to the queue and starts it if a slot is free.
    ///
    /// `task` is called when the job is dequeued; its future is then driven on
    /// the scheduler.
    pub fn push<T, E, Fut, Job>(&self, task: Job) -> TaskId
    where
        Job: FnOnce() -> Fut + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + 'static,
        E: fmt::Display,
    {
        let job: BoxedJob = Box::new(move || {
            Box::pin(async move { task().await.map(drop).map_err(|err| err.to_string()) })
        });
        let id = {
            let mut state = self.inner.state.borrow_mut();
            state.next_id += 1;
            let id = TaskId(state.next_id);
            state.queue.push_back(QueuedJob { id, job });
            state.metrics.total_pushed += 1;
            trace!(task_id = %id, queued = state.queue.len(), "task pushed");
            id
        };
        Self::pump(&self.inner);
        id
    }

    /// Returns the number of running jobs.
    #[must_use]
    pub fn running(&self) -> usize {
        self.inner.state.borrow().running
    }

    /// Returns the number of queued jobs that have not started.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.inner.state.borrow().queue.len()
    }

    /// Returns the concurrency ceiling.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.inner.limit
    }

    /// Returns a snapshot of the runner's counters.
    #[must_use]
    pub fn metrics(&self) -> RunnerMetrics {
        self.inner.state.borrow().metrics
    }

    /// Removes and returns the retained failures, oldest first.
    pub fn take_failures(&self) -> Vec<TaskFailure> {
        std::mem::take(&mut self.inner.state.borrow_mut().failures).into()
    }

    /// Returns a future that resolves once no job is queued or running.
    pub fn idle(&self) -> Idle<S> {
        Idle {
            inner: Rc::clone(&self.inner),
        }
    }

    /// Starts queued jobs while a slot is free.
    fn pump(inner: &Rc<Inner<S>>) {
        loop {
            let next = {
                let mut state = inner.state.borrow_mut();
                if state.running >= inner.limit {
                    break;
                }
                let Some(next) = state.queue.pop_front() else {
                    break;
                };
                state.running += 1;
                state.metrics.peak_running = state.metrics.peak_running.max(state.running);
                trace!(task_id = %next.id, running = state.running, "task started");
                next
            };
            let QueuedJob { id, job } = next;
            let runner = Rc::clone(inner);
            inner.scheduler.spawn_local(Box::pin(async move {
                let outcome = AssertUnwindSafe(async move { job().await })
                    .catch_unwind()
                    .await;
                Self::finish(&runner, id, outcome);
            }));
        }
    }

    fn finish(
        inner: &Rc<Inner<S>>,
        id: TaskId,
        outcome: std::thread::Result<std::result::Result<(), String>>,
    ) {
        {
            let mut state = inner.state.borrow_mut();
            state.running -= 1;
            match outcome {
                Ok(Ok(())) => {
                    state.metrics.completed += 1;
                    trace!(task_id = %id, "task completed");
                }
                Ok(Err(message)) => {
                    state.metrics.failed += 1;
                    let failure = TaskFailure::Failed { id, message };
                    warn!(task_id = %id, error = %failure, "task failed; continuing with queue");
                    state.record_failure(failure, inner.failure_history);
                }
                Err(payload) => {
                    state.metrics.panicked += 1;
                    let failure = TaskFailure::Panicked {
                        id,
                        message: panic_message(payload.as_ref()),
                    };
                    warn!(task_id = %id, error = %failure, "task panicked; continuing with queue");
                    state.record_failure(failure, inner.failure_history);
                }
            }
        }
        Self::pump(inner);
        let waiters = {
            let mut state = inner.state.borrow_mut();
            if state.is_idle() {
                std::mem::take(&mut state.idle_waiters)
            } else {
                Vec::new()
            }
        };
        for waker in waiters {
            waker.wake();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl<S: Scheduler> Clone for TaskRunner<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: Scheduler> fmt::Debug for TaskRunner<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("TaskRunner")
            .field("limit", &self.inner.limit)
            .field("running", &state.running)
            .field("queued", &state.queue.len())
            .field("metrics", &state.metrics)
            .finish()
    }
}

/// Future returned by [`TaskRunner::idle`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Idle<S: Scheduler = Handle> {
    inner: Rc<Inner<S>>,
}

impl<S: Scheduler> Future for Idle<S> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut state = self.inner.state.borrow_mut();
        if state.is_idle() {
            return Poll::Ready(());
        }
        if !state.idle_waiters.iter().any(|w| w.will_wake(cx.waker())) {
            state.idle_waiters.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl<S: Scheduler> fmt::Debug for Idle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Idle").finish_non_exhaustive()
    }
}
