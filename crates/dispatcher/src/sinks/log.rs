//! LogSink - logs delivered events via tracing

use contracts::{ChannelError, EventSink, EventValue, EVENT_BATCH};
use tracing::info;

/// Sink that logs event summaries for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl EventSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn add(&self, event: EventValue) -> Result<(), ChannelError> {
        match event.as_record() {
            Some(record) if record.event_name() == Some(EVENT_BATCH) => {
                let batch_len = record.get_list("events").map_or(0, |events| events.len());
                info!(
                    sink = %self.name,
                    event = EVENT_BATCH,
                    batch_len,
                    "batch received"
                );
            }
            Some(record) => {
                info!(
                    sink = %self.name,
                    event = record.event_name().unwrap_or(""),
                    "event received"
                );
            }
            None => {
                info!(sink = %self.name, value = ?event, "bare value received");
            }
        }
        Ok(())
    }
}
