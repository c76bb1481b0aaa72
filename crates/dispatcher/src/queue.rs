//! Event queue - FIFO shared by producer callbacks and the drain worker

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::EventValue;

/// Unbounded FIFO of encoded event records behind a single mutex
///
/// Producers push from arbitrary callback threads; the drain worker removes
/// bounded batches. The queue itself imposes no bound; bounding is a batching
/// concern.
#[derive(Debug, Default)]
pub struct EventQueue {
    inner: Mutex<VecDeque<EventValue>>,
}

impl EventQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record to the tail, O(1) amortized
    pub fn push(&self, record: EventValue) {
        self.locked().push_back(record);
    }

    /// Atomically remove and return the first up-to-`max` records in order
    ///
    /// Returns an empty vector when the queue is empty.
    pub fn drain_batch(&self, max: usize) -> Vec<EventValue> {
        let mut guard = self.locked();
        let take = guard.len().min(max);
        guard.drain(..take).collect()
    }

    /// Momentary emptiness; a scheduling hint, never a delivery guarantee
    pub fn is_empty(&self) -> bool {
        self.locked().is_empty()
    }

    /// Momentary length, with the same staleness caveat as `is_empty`
    pub fn len(&self) -> usize {
        self.locked().len()
    }

    fn locked(&self) -> MutexGuard<'_, VecDeque<EventValue>> {
        // Entries are plain data; the deque stays consistent even if a
        // holder panicked, so a poisoned lock is recoverable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
