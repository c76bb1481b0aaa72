//! Mock Bridge Demo
//!
//! Drives a mock data channel through the dispatcher to a JSON sink, without
//! a native WebRTC stack. Events are printed as the application layer would
//! receive them: bare records for singles, batch envelopes for bursts.
//!
//! Run with: cargo run -p demos --bin mock_bridge

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use contracts::{DataChannelEvents, DataChannelState, MessageBuffer, StreamHandler};
use dispatcher::{
    DataChannelEventDispatcher, InlineRunner, JsonSink, MockDataChannel, MockEventChannelRegistry,
};
use observability::{LogFormat, ObservabilityConfig};

fn main() -> anyhow::Result<()> {
    observability::init_with_config(ObservabilityConfig {
        log_format: LogFormat::Compact,
        metrics_port: None,
        default_log_level: "info".to_string(),
    })?;

    tracing::info!("Starting Mock Bridge Demo");

    // ==== Stage 1: Register the dispatcher for one data channel ====
    let registry = MockEventChannelRegistry::new();
    let channel = Arc::new(MockDataChannel::new(1));
    let dispatcher = DataChannelEventDispatcher::register(
        &registry,
        "pc0",
        "1",
        channel.clone(),
        Arc::new(InlineRunner),
    )?;
    tracing::info!(stream = dispatcher.stream_name(), "dispatcher registered");

    // ==== Stage 2: Attach a consumer through the stream-handler surface ====
    let handler = registry
        .handler(dispatcher.stream_name())
        .ok_or_else(|| anyhow!("stream handler not registered"))?;
    handler.on_listen(None, Arc::new(JsonSink::stdout("demo")));

    // ==== Stage 3: Fire upstream callbacks from producer threads ====
    channel.set_state(DataChannelState::Open);
    dispatcher.on_state_change();

    let mut producers = Vec::new();
    for label in ["alpha", "beta"] {
        let dispatcher = Arc::clone(&dispatcher);
        let channel = Arc::clone(&channel);
        producers.push(std::thread::spawn(move || {
            for seq in 0..20i64 {
                dispatcher.on_message(MessageBuffer::text(format!("{label}-{seq}")));
                channel.set_buffered_amount(64 * (seq + 1));
                dispatcher.on_buffered_amount_change(64);
            }
        }));
    }
    for producer in producers {
        producer
            .join()
            .map_err(|_| anyhow!("producer thread panicked"))?;
    }

    channel.set_state(DataChannelState::Closed);
    dispatcher.on_state_change();

    // Give the dispatch thread a moment to drain the tail.
    std::thread::sleep(Duration::from_millis(100));

    // ==== Stage 4: Report metrics ====
    let snapshot = dispatcher.metrics().snapshot();
    observability::record_events_enqueued(dispatcher.stream_name(), snapshot.enqueued_count);
    observability::record_records_delivered(dispatcher.stream_name(), snapshot.delivered_count);
    observability::record_queue_depth(dispatcher.stream_name(), snapshot.queue_len);

    tracing::info!(
        enqueued = snapshot.enqueued_count,
        delivered = snapshot.delivered_count,
        batches = snapshot.batch_count,
        failures = snapshot.failure_count,
        "Mock Bridge Demo finished"
    );

    Ok(())
}
