//! Deadline-ordered queue of one-shot timer callbacks.
//!
//! This is the delay primitive behind every scheduled firing in the crate:
//! the trailing edge of a debounce, the trailing edge of a throttle, and the
//! wakeup of a [`Sleep`](super::Sleep).
//!
//! # Ordering
//!
//! Callbacks expire in deadline order. Callbacks sharing a deadline expire
//! in insertion order, so two timers armed for the same instant always fire
//! in the order they were scheduled.
//!
//! # Cancellation
//!
//! Callbacks live in a map keyed by timer id; the heap only carries
//! `(deadline, id)` pairs. Cancelling removes the callback, and the orphaned
//! heap entry is discarded lazily when it reaches the top.

use crate::types::Time;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;

/// A one-shot callback run when its timer expires.
pub type TimerCallback = Box<dyn FnOnce()>;

/// Identifies a scheduled timer so it can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    id: u64,
    deadline: Time,
}

impl TimerHandle {
    /// Returns the timer id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Returns the deadline the timer was armed for.
    #[must_use]
    pub const fn deadline(&self) -> Time {
        self.deadline
    }
}

#[derive(Debug, PartialEq, Eq)]
struct HeapEntry {
    deadline: Time,
    id: u64,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: earliest deadline first, then lowest id.
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Deadline-ordered queue of timer callbacks.
#[derive(Default)]
pub struct TimerQueue {
    heap: BinaryHeap<HeapEntry>,
    callbacks: HashMap<u64, TimerCallback>,
    next_id: u64,
}

impl TimerQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of armed (not cancelled, not fired) timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Returns true if no timer is armed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Arms a timer that runs `callback` once `deadline` is reached.
    pub fn insert(&mut self, deadline: Time, callback: TimerCallback) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.heap.push(HeapEntry { deadline, id });
        self.callbacks.insert(id, callback);
        TimerHandle { id, deadline }
    }

    /// Disarms a timer.
    ///
    /// Returns true if the timer was still armed; false if it already fired
    /// or was cancelled before.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.callbacks.remove(&handle.id).is_some()
    }

    /// Returns true if the timer behind `handle` is still armed.
    #[must_use]
    pub fn contains(&self, handle: TimerHandle) -> bool {
        self.callbacks.contains_key(&handle.id)
    }

    /// Returns the earliest deadline among armed timers.
    pub fn next_deadline(&mut self) -> Option<Time> {
        self.discard_cancelled_head();
        self.heap.peek().map(|entry| entry.deadline)
    }

    /// Removes and returns the earliest timer whose deadline is at or before
    /// `now`.
    pub fn pop_expired(&mut self, now: Time) -> Option<(TimerHandle, TimerCallback)> {
        self.discard_cancelled_head();
        if self.heap.peek().is_some_and(|entry| entry.deadline <= now) {
            let entry = self.heap.pop()?;
            let callback = self.callbacks.remove(&entry.id)?;
            return Some((
                TimerHandle {
                    id: entry.id,
                    deadline: entry.deadline,
                },
                callback,
            ));
        }
        None
    }

    /// Drops every armed timer without running it.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.callbacks.clear();
    }

    fn discard_cancelled_head(&mut self) {
        while let Some(entry) = self.heap.peek() {
            if self.callbacks.contains_key(&entry.id) {
                break;
            }
            self.heap.pop();
        }
    }
}

impl fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerQueue")
            .field("armed", &self.callbacks.len())
            .field("heap_entries", &self.heap.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}
