//! JsonSink - renders delivered events as JSON lines

use contracts::{ChannelError, EventSink, EventValue};

/// Sink serializing each delivered value to JSON and handing it to a writer
///
/// The writer callback receives one JSON document per delivery; byte payloads
/// render as number arrays, text as strings.
pub struct JsonSink {
    name: String,
    write: Box<dyn Fn(String) + Send + Sync>,
}

impl JsonSink {
    /// Create a JsonSink backed by the given writer
    pub fn new(name: impl Into<String>, write: impl Fn(String) + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            write: Box::new(write),
        }
    }

    /// Create a JsonSink printing one line per delivery to stdout
    pub fn stdout(name: impl Into<String>) -> Self {
        Self::new(name, |line| println!("{line}"))
    }
}

impl EventSink for JsonSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn add(&self, event: EventValue) -> Result<(), ChannelError> {
        let line = serde_json::to_string(&event)
            .map_err(|e| ChannelError::sink_delivery(&self.name, e.to_string()))?;
        (self.write)(line);
        Ok(())
    }
}
