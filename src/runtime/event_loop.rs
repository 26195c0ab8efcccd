//! A cooperative single-threaded event loop.
//!
//! The loop owns a clock, a timer queue, a task table, and a ready queue.
//! One turn works like a browser or Node loop:
//!
//! 1. Poll every ready task until the ready queue is empty ("microtasks").
//! 2. Fire the earliest expired timer, then go back to step 1.
//! 3. If nothing is ready and the earliest timer lies in the future, ask the
//!    clock to wait until that deadline.
//!
//! Under a [`VirtualClock`](crate::time::VirtualClock) step 3 is a jump, so
//! tests covering minutes of debounce and throttle activity run instantly and
//! deterministically.
//!
//! Panics raised by a timer callback or a task propagate out of the driving
//! call ([`block_on`](EventLoop::block_on),
//! [`run_until_idle`](EventLoop::run_until_idle), or
//! [`advance`](EventLoop::advance)).

use super::config::{LoopConfig, StepBudget};
use super::scheduler::{LocalFuture, Scheduler};
use super::task::{self, JoinHandle, JoinState, ReadyQueue, Task};
use crate::error::{Error, Result};
use crate::time::{
    Sleep, TimeSource, Timeout, TimerCallback, TimerHandle, TimerQueue, VirtualClock, WallClock,
};
use crate::types::Time;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::pin;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};
use std::time::Duration;

struct Shared {
    clock: Arc<dyn TimeSource>,
    timers: RefCell<TimerQueue>,
    tasks: RefCell<HashMap<u64, Task>>,
    ready: Arc<ReadyQueue>,
    next_task_id: Cell<u64>,
    config: LoopConfig,
}

/// Counters describing the work done by one driving call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Number of task polls.
    pub polls: u64,
    /// Number of timer callbacks run.
    pub timers_fired: u64,
    /// Number of tasks that ran to completion.
    pub tasks_completed: u64,
}

/// A cheap, clonable reference to an [`EventLoop`].
///
/// This is the crate's default [`Scheduler`]. Components hold a `Handle`, not
/// the loop itself.
#[derive(Clone)]
pub struct Handle {
    shared: Rc<Shared>,
}

impl Handle {
    /// Spawns a future onto the loop and returns a handle to its output.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + 'static,
    {
        let state = Rc::new(RefCell::new(JoinState::new()));
        let output_state = Rc::clone(&state);
        self.spawn_local(Box::pin(async move {
            let output = future.await;
            task::complete(&output_state, output);
        }));
        JoinHandle::new(state)
    }

    /// Returns a future that completes after `duration`.
    #[must_use]
    pub fn sleep(&self, duration: Duration) -> Sleep {
        Sleep::after(self.clone(), duration)
    }

    /// Returns a future that completes at `deadline`.
    #[must_use]
    pub fn sleep_until(&self, deadline: Time) -> Sleep {
        Sleep::until(self.clone(), deadline)
    }

    /// Races `future` against a timer of `duration`.
    pub fn timeout<F: Future>(&self, duration: Duration, future: F) -> Timeout<F> {
        crate::time::timeout(self, duration, future)
    }

    /// Returns the number of armed timers.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.shared.timers.borrow().len()
    }

    /// Returns the number of spawned tasks that have not completed.
    #[must_use]
    pub fn active_tasks(&self) -> usize {
        self.shared.tasks.borrow().len()
    }
}

impl Scheduler for Handle {
    fn now(&self) -> Time {
        self.shared.clock.now()
    }

    fn schedule_at(&self, deadline: Time, callback: TimerCallback) -> TimerHandle {
        let handle = self.shared.timers.borrow_mut().insert(deadline, callback);
        tracing::trace!(timer_id = handle.id(), %deadline, "timer armed");
        handle
    }

    fn cancel(&self, timer: TimerHandle) -> bool {
        let cancelled = self.shared.timers.borrow_mut().cancel(timer);
        if cancelled {
            tracing::trace!(timer_id = timer.id(), "timer cancelled");
        }
        cancelled
    }

    fn spawn_local(&self, future: LocalFuture) {
        let id = self.shared.next_task_id.get();
        self.shared.next_task_id.set(id + 1);
        let task = Task::new(id, future, &self.shared.ready);
        self.shared.tasks.borrow_mut().insert(id, task);
        tracing::trace!(task_id = id, "task spawned");
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("now", &self.shared.clock.now())
            .field("pending_timers", &self.pending_timers())
            .field("active_tasks", &self.active_tasks())
            .finish()
    }
}

/// Wakes the future driven by [`EventLoop::block_on`].
#[derive(Debug)]
struct RootWaker {
    woken: AtomicBool,
}

impl Wake for RootWaker {
    fn wake(self: Arc<Self>) {
        self.woken.store(true, Ordering::Release);
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.woken.store(true, Ordering::Release);
    }
}

/// A single-threaded event loop with timers and local tasks.
///
/// # Example
///
/// ```
/// use pacer::runtime::EventLoop;
/// use pacer::types::Time;
/// use std::time::Duration;
///
/// let lp = EventLoop::virtual_time();
/// let handle = lp.handle();
/// let value = lp
///     .block_on(async move {
///         handle.sleep(Duration::from_millis(100)).await;
///         7
///     })
///     .unwrap();
/// assert_eq!(value, 7);
/// assert_eq!(lp.now(), Time::from_millis(100));
/// ```
pub struct EventLoop {
    handle: Handle,
}

impl EventLoop {
    /// Creates a loop on the wall clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(WallClock::new()))
    }

    /// Creates a loop on a virtual clock starting at zero.
    #[must_use]
    pub fn virtual_time() -> Self {
        Self::with_clock(Arc::new(VirtualClock::new()))
    }

    /// Creates a loop on the given clock with the default configuration.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn TimeSource>) -> Self {
        Self::with_config(LoopConfig::default(), clock)
    }

    /// Creates a loop with an explicit configuration and clock.
    #[must_use]
    pub fn with_config(config: LoopConfig, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            handle: Handle {
                shared: Rc::new(Shared {
                    clock,
                    timers: RefCell::new(TimerQueue::new()),
                    tasks: RefCell::new(HashMap::new()),
                    ready: Arc::new(ReadyQueue::default()),
                    next_task_id: Cell::new(0),
                    config,
                }),
            },
        }
    }

    /// Returns a handle for scheduling work on this loop.
    #[must_use]
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    /// Returns the current time on the loop's clock.
    #[must_use]
    pub fn now(&self) -> Time {
        self.handle.now()
    }

    /// Returns the loop configuration.
    #[must_use]
    pub fn config(&self) -> &LoopConfig {
        &self.handle.shared.config
    }

    /// Drives `future` to completion, running tasks and timers as needed.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Stalled`](crate::error::ErrorKind::Stalled) if the
    ///   future is pending with no runnable task and no armed timer.
    /// - [`ErrorKind::StepLimitExceeded`](crate::error::ErrorKind::StepLimitExceeded)
    ///   if the configured step limit is reached.
    pub fn block_on<F: Future>(&self, future: F) -> Result<F::Output> {
        let mut future = pin!(future);
        let root = Arc::new(RootWaker {
            woken: AtomicBool::new(true),
        });
        let waker = Waker::from(Arc::clone(&root));
        let mut cx = Context::from_waker(&waker);
        let mut budget = StepBudget::new(self.handle.shared.config.max_steps);
        let mut stats = RunStats::default();

        loop {
            if root.woken.swap(false, Ordering::AcqRel) {
                budget.tick()?;
                if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
                    tracing::debug!(
                        polls = stats.polls,
                        timers_fired = stats.timers_fired,
                        "block_on complete"
                    );
                    return Ok(output);
                }
            }
            if self.drain_ready(&mut stats, &mut budget)? > 0 || root.woken.load(Ordering::Acquire)
            {
                continue;
            }
            if !self.fire_next_timer(None, &mut stats, &mut budget)? {
                let pending = self.handle.active_tasks();
                tracing::warn!(pending_tasks = pending, "event loop stalled");
                return Err(Error::stalled(pending));
            }
        }
    }

    /// Runs until no task is ready and no timer is armed.
    ///
    /// The clock is moved through each timer deadline in turn.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::StepLimitExceeded`](crate::error::ErrorKind::StepLimitExceeded)
    /// if the configured step limit is reached.
    pub fn run_until_idle(&self) -> Result<RunStats> {
        let mut budget = StepBudget::new(self.handle.shared.config.max_steps);
        let mut stats = RunStats::default();
        loop {
            self.drain_ready(&mut stats, &mut budget)?;
            if !self.fire_next_timer(None, &mut stats, &mut budget)? {
                break;
            }
        }
        tracing::debug!(
            polls = stats.polls,
            timers_fired = stats.timers_fired,
            tasks_completed = stats.tasks_completed,
            "run_until_idle complete"
        );
        Ok(stats)
    }

    /// Runs everything due within the next `duration` and leaves the clock at
    /// `now + duration`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::StepLimitExceeded`](crate::error::ErrorKind::StepLimitExceeded)
    /// if the configured step limit is reached.
    pub fn advance(&self, duration: Duration) -> Result<RunStats> {
        let target = self.now() + duration;
        let mut budget = StepBudget::new(self.handle.shared.config.max_steps);
        let mut stats = RunStats::default();
        loop {
            self.drain_ready(&mut stats, &mut budget)?;
            if !self.fire_next_timer(Some(target), &mut stats, &mut budget)? {
                break;
            }
        }
        if target > self.now() {
            self.handle.shared.clock.wait_until(target);
        }
        Ok(stats)
    }

    /// Polls ready tasks until the ready queue is empty.
    fn drain_ready(&self, stats: &mut RunStats, budget: &mut StepBudget) -> Result<u64> {
        let shared = &self.handle.shared;
        let mut polled = 0;
        while let Some(id) = shared.ready.pop() {
            if !shared.tasks.borrow().contains_key(&id) {
                continue;
            }
            if let Err(err) = budget.tick() {
                shared.ready.push_front(id);
                return Err(err);
            }
            // The task leaves the table while it runs so it can spawn, cancel,
            // and schedule through the handle.
            let Some(mut task) = shared.tasks.borrow_mut().remove(&id) else {
                continue;
            };
            polled += 1;
            stats.polls += 1;
            match task.poll() {
                Poll::Ready(()) => {
                    stats.tasks_completed += 1;
                    tracing::trace!(task_id = id, "task complete");
                }
                Poll::Pending => {
                    shared.tasks.borrow_mut().insert(id, task);
                }
            }
        }
        Ok(polled)
    }

    /// Fires the earliest armed timer whose deadline is not after `limit`,
    /// waiting on the clock if that deadline lies in the future.
    ///
    /// Returns false if there was no such timer.
    fn fire_next_timer(
        &self,
        limit: Option<Time>,
        stats: &mut RunStats,
        budget: &mut StepBudget,
    ) -> Result<bool> {
        let shared = &self.handle.shared;
        let next = shared.timers.borrow_mut().next_deadline();
        let Some(deadline) = next else {
            return Ok(false);
        };
        if limit.is_some_and(|limit| deadline > limit) {
            return Ok(false);
        }
        if deadline > shared.clock.now() {
            shared.clock.wait_until(deadline);
        }
        let now = shared.clock.now().max(deadline);
        let expired = shared.timers.borrow_mut().pop_expired(now);
        if let Some((timer, callback)) = expired {
            budget.tick()?;
            stats.timers_fired += 1;
            tracing::trace!(timer_id = timer.id(), deadline = %timer.deadline(), "timer fired");
            callback();
        }
        Ok(true)
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("handle", &self.handle)
            .field("config", &self.handle.shared.config)
            .finish()
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        // Tasks and timers hold handles back to the loop. Dropping them here
        // breaks the cycle; their destructors may cancel timers or spawn, so
        // no borrow is held while they run.
        loop {
            let tasks = std::mem::take(&mut *self.handle.shared.tasks.borrow_mut());
            let timers = std::mem::take(&mut *self.handle.shared.timers.borrow_mut());
            if tasks.is_empty() && timers.is_empty() {
                break;
            }
            drop(tasks);
            drop(timers);
        }
        while self.handle.shared.ready.pop().is_some() {}
    }
}
