//! Spawned tasks, their wakers, and join handles.
//!
//! Wakers must be `Send + Sync`, so a task's waker only pushes the task id onto
//! a shared ready queue. The event loop owns the futures and polls them on its
//! own thread when it pops the id. A task already sitting in the ready queue
//! is not pushed again, however many times it is woken.

use super::scheduler::LocalFuture;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

/// FIFO of task ids that are ready to be polled.
#[derive(Debug, Default)]
pub(crate) struct ReadyQueue {
    ids: Mutex<VecDeque<u64>>,
}

impl ReadyQueue {
    pub(crate) fn push(&self, id: u64) {
        self.ids.lock().push_back(id);
    }

    pub(crate) fn push_front(&self, id: u64) {
        self.ids.lock().push_front(id);
    }

    pub(crate) fn pop(&self) -> Option<u64> {
        self.ids.lock().pop_front()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.ids.lock().len()
    }
}

/// A waker for a specific task.
#[derive(Debug)]
struct TaskWaker {
    id: u64,
    ready: Arc<ReadyQueue>,
    queued: AtomicBool,
}

impl TaskWaker {
    fn schedule(&self) {
        if !self.queued.swap(true, Ordering::AcqRel) {
            self.ready.push(self.id);
        }
    }
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.schedule();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.schedule();
    }
}

/// A spawned future together with its waker.
pub(crate) struct Task {
    future: LocalFuture,
    waker: Arc<TaskWaker>,
}

impl Task {
    /// Creates a task and queues it for its first poll.
    pub(crate) fn new(id: u64, future: LocalFuture, ready: &Arc<ReadyQueue>) -> Self {
        let waker = Arc::new(TaskWaker {
            id,
            ready: Arc::clone(ready),
            queued: AtomicBool::new(false),
        });
        waker.schedule();
        Self { future, waker }
    }

    /// Polls the task once.
    pub(crate) fn poll(&mut self) -> Poll<()> {
        // Clear before polling so a wake during the poll re-queues the task.
        self.waker.queued.store(false, Ordering::Release);
        let waker = Waker::from(Arc::clone(&self.waker));
        let mut cx = Context::from_waker(&waker);
        self.future.as_mut().poll(&mut cx)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.waker.id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub(crate) struct JoinState<T> {
    output: Option<T>,
    finished: bool,
    waker: Option<Waker>,
}

impl<T> JoinState<T> {
    pub(crate) const fn new() -> Self {
        Self {
            output: None,
            finished: false,
            waker: None,
        }
    }
}

/// Stores a task's output and wakes whoever awaits its [`JoinHandle`].
pub(crate) fn complete<T>(state: &RefCell<JoinState<T>>, output: T) {
    let waker = {
        let mut state = state.borrow_mut();
        state.output = Some(output);
        state.finished = true;
        state.waker.take()
    };
    if let Some(waker) = waker {
        waker.wake();
    }
}

/// Handle to a task spawned with [`Handle::spawn`](super::Handle::spawn).
///
/// Awaiting the handle yields the task's output. Dropping it detaches the
/// task; the task keeps running.
#[must_use = "dropping a JoinHandle detaches the task"]
pub struct JoinHandle<T> {
    state: Rc<RefCell<JoinState<T>>>,
}

impl<T> JoinHandle<T> {
    pub(crate) const fn new(state: Rc<RefCell<JoinState<T>>>) -> Self {
        Self { state }
    }

    /// Returns true if the task has completed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.borrow().finished
    }

    /// Takes the task's output if it has completed and not been taken yet.
    pub fn try_take(&self) -> Option<T> {
        self.state.borrow_mut().output.take()
    }
}

impl<T> Future for JoinHandle<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let mut state = self.state.borrow_mut();
        if let Some(output) = state.output.take() {
            return Poll::Ready(output);
        }
        assert!(!state.finished, "JoinHandle polled after completion");
        state.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl<T> fmt::Debug for JoinHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinHandle")
            .field("finished", &self.is_finished())
            .finish()
    }
}
