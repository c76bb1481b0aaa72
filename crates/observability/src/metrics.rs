//! Event bridge metric recording
//!
//! Thin helpers over the `metrics` macros; values come from the dispatcher's
//! per-instance snapshots, labelled by stream name.

use metrics::{counter, gauge, histogram};

/// Record records enqueued by producers
pub fn record_events_enqueued(stream: &str, count: u64) {
    if count > 0 {
        counter!("bridge_events_enqueued_total", "stream" => stream.to_string()).increment(count);
    }
}

/// Record records delivered to the sink (flattened across batches)
pub fn record_records_delivered(stream: &str, count: u64) {
    if count > 0 {
        counter!("bridge_records_delivered_total", "stream" => stream.to_string())
            .increment(count);
    }
}

/// Record one delivered batch envelope and its size
pub fn record_batch_delivered(stream: &str, batch_size: usize) {
    counter!("bridge_batches_delivered_total", "stream" => stream.to_string()).increment(1);
    histogram!("bridge_batch_size", "stream" => stream.to_string()).record(batch_size as f64);
}

/// Record a failed sink delivery
pub fn record_delivery_failure(stream: &str) {
    counter!("bridge_delivery_failures_total", "stream" => stream.to_string()).increment(1);
}

/// Record the momentary queue depth
pub fn record_queue_depth(stream: &str, depth: usize) {
    gauge!("bridge_queue_depth", "stream" => stream.to_string()).set(depth as f64);
}
