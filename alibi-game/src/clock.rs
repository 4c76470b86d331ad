//! Deterministic scheduler for countdowns and display delays.
//!
//! The engine never touches the wall clock. Every timer lives on a virtual
//! clock that the embedding layer advances explicitly, so tests (and the
//! headless tester) can simulate time instead of racing real delays. Handles
//! are cancellable; a countdown that was cancelled before its deadline never
//! fires, which is how a stale timeout is prevented from double-applying
//! after a manual answer already advanced the session.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Handle to a scheduled timer, used to cancel it before it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Entry<E> {
    due: u64,
    seq: u64,
    handle: TimerHandle,
    event: E,
}

impl<E> PartialEq for Entry<E> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<E> Eq for Entry<E> {}

impl<E> PartialOrd for Entry<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Entry<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse so the BinaryHeap pops the earliest (due, seq) first.
        (other.due, other.seq).cmp(&(self.due, self.seq))
    }
}

/// Virtual clock owning a queue of one-shot timers.
#[derive(Debug)]
pub struct VirtualClock<E> {
    now_ms: u64,
    next_seq: u64,
    queue: BinaryHeap<Entry<E>>,
    cancelled: Vec<TimerHandle>,
}

impl<E> Default for VirtualClock<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> VirtualClock<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_seq: 0,
            queue: BinaryHeap::new(),
            cancelled: Vec::new(),
        }
    }

    /// Current simulated time in milliseconds.
    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Schedule `event` to fire `delay_ms` from now.
    pub fn schedule(&mut self, delay_ms: u64, event: E) -> TimerHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        let handle = TimerHandle(seq);
        self.queue.push(Entry {
            due: self.now_ms.saturating_add(delay_ms),
            seq,
            handle,
            event,
        });
        handle
    }

    /// Cancel a pending timer. Returns false when the timer already fired
    /// or was cancelled before.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let pending = self.queue.iter().any(|entry| entry.handle == handle);
        if pending && !self.cancelled.contains(&handle) {
            self.cancelled.push(handle);
            true
        } else {
            false
        }
    }

    /// Number of live (not yet fired, not cancelled) timers.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue
            .iter()
            .filter(|entry| !self.cancelled.contains(&entry.handle))
            .count()
    }

    /// Simulated time until the next live timer fires, if any.
    #[must_use]
    pub fn next_due_in_ms(&self) -> Option<u64> {
        self.queue
            .iter()
            .filter(|entry| !self.cancelled.contains(&entry.handle))
            .map(|entry| entry.due.saturating_sub(self.now_ms))
            .min()
    }

    /// Advance the clock by `delta_ms`, draining every timer that comes due,
    /// in firing order. Cancelled timers are discarded silently.
    pub fn advance(&mut self, delta_ms: u64) -> Vec<(TimerHandle, E)> {
        let target = self.now_ms.saturating_add(delta_ms);
        let mut fired = Vec::new();
        while let Some(entry) = self.queue.peek() {
            if entry.due > target {
                break;
            }
            let entry = self.queue.pop().expect("peeked entry exists");
            self.now_ms = entry.due.max(self.now_ms);
            if let Some(pos) = self.cancelled.iter().position(|h| *h == entry.handle) {
                self.cancelled.swap_remove(pos);
                continue;
            }
            fired.push((entry.handle, entry.event));
        }
        self.now_ms = target;
        fired
    }
}
