//! Dispatch metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for a single dispatcher
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Current queue length
    queue_len: AtomicUsize,
    /// Records enqueued by producers
    enqueued_count: AtomicU64,
    /// Records delivered to the sink, flattened across batches
    delivered_count: AtomicU64,
    /// Batch envelopes delivered
    batch_count: AtomicU64,
    /// Failed sink deliveries
    failure_count: AtomicU64,
}

impl DispatchMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current queue length
    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    /// Set current queue length
    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get enqueued record count
    pub fn enqueued_count(&self) -> u64 {
        self.enqueued_count.load(Ordering::Relaxed)
    }

    /// Increment enqueued record count
    pub fn inc_enqueued(&self) {
        self.enqueued_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get delivered record count
    pub fn delivered_count(&self) -> u64 {
        self.delivered_count.load(Ordering::Relaxed)
    }

    /// Add delivered records
    pub fn add_delivered(&self, count: u64) {
        self.delivered_count.fetch_add(count, Ordering::Relaxed);
    }

    /// Get delivered batch envelope count
    pub fn batch_count(&self) -> u64 {
        self.batch_count.load(Ordering::Relaxed)
    }

    /// Increment delivered batch envelope count
    pub fn inc_batches(&self) {
        self.batch_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get delivery failure count
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Increment delivery failure count
    pub fn inc_failures(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            enqueued_count: self.enqueued_count(),
            delivered_count: self.delivered_count(),
            batch_count: self.batch_count(),
            failure_count: self.failure_count(),
        }
    }
}

/// Snapshot of dispatch metrics (for reporting)
#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub enqueued_count: u64,
    pub delivered_count: u64,
    pub batch_count: u64,
    pub failure_count: u64,
}
