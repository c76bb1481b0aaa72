//! Mock data-channel plumbing
//!
//! Used by tests and demos that run without a native WebRTC stack.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use contracts::{
    ChannelError, DataChannelHandle, DataChannelState, EventChannelRegistry, EventSink,
    EventValue, StreamHandler, EVENT_BATCH,
};

/// Scriptable data-channel handle
///
/// Tests set the state and buffered amount before firing the matching
/// observer callback, mirroring how the native library exposes both.
#[derive(Debug)]
pub struct MockDataChannel {
    id: i32,
    state: RwLock<DataChannelState>,
    buffered_amount: AtomicI64,
}

impl MockDataChannel {
    /// Create a channel handle with the given id, starting out connecting
    pub fn new(id: i32) -> Self {
        Self {
            id,
            state: RwLock::new(DataChannelState::Connecting),
            buffered_amount: AtomicI64::new(0),
        }
    }

    /// Script the current state
    pub fn set_state(&self, state: DataChannelState) {
        *self.state.write().unwrap() = state;
    }

    /// Script the current buffered amount
    pub fn set_buffered_amount(&self, amount: i64) {
        self.buffered_amount.store(amount, Ordering::SeqCst);
    }
}

impl DataChannelHandle for MockDataChannel {
    fn id(&self) -> i32 {
        self.id
    }

    fn state(&self) -> DataChannelState {
        *self.state.read().unwrap()
    }

    fn buffered_amount(&self) -> i64 {
        self.buffered_amount.load(Ordering::SeqCst)
    }
}

/// Sink recording every delivered value
pub struct RecordingSink {
    name: String,
    events: Mutex<Vec<EventValue>>,
    fail_delivery: AtomicBool,
}

impl RecordingSink {
    /// Create a recording sink
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            events: Mutex::new(Vec::new()),
            fail_delivery: AtomicBool::new(false),
        }
    }

    /// Everything delivered so far, in delivery order
    pub fn events(&self) -> Vec<EventValue> {
        self.events.lock().unwrap().clone()
    }

    /// Delivered records with batch envelopes expanded in place
    ///
    /// The flattened sequence is what the application layer observes after
    /// unwrapping, so ordering assertions run against it.
    pub fn flattened(&self) -> Vec<EventValue> {
        let mut flat = Vec::new();
        for event in self.events.lock().unwrap().iter() {
            match event.as_record() {
                Some(record) if record.event_name() == Some(EVENT_BATCH) => {
                    if let Some(inner) = record.get_list("events") {
                        flat.extend_from_slice(inner);
                    }
                }
                _ => flat.push(event.clone()),
            }
        }
        flat
    }

    /// Make every subsequent delivery fail (or succeed again)
    pub fn set_fail_delivery(&self, fail: bool) {
        self.fail_delivery.store(fail, Ordering::SeqCst);
    }
}

impl EventSink for RecordingSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn add(&self, event: EventValue) -> Result<(), ChannelError> {
        if self.fail_delivery.load(Ordering::SeqCst) {
            return Err(ChannelError::sink_delivery(&self.name, "mock failure"));
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Registry capturing stream handlers by name
#[derive(Default)]
pub struct MockEventChannelRegistry {
    handlers: Mutex<HashMap<String, Arc<dyn StreamHandler>>>,
}

impl MockEventChannelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the handler registered for `stream_name`
    pub fn handler(&self, stream_name: &str) -> Option<Arc<dyn StreamHandler>> {
        self.handlers.lock().unwrap().get(stream_name).cloned()
    }

    /// Names of all registered streams
    pub fn stream_names(&self) -> Vec<String> {
        self.handlers.lock().unwrap().keys().cloned().collect()
    }
}

impl EventChannelRegistry for MockEventChannelRegistry {
    fn set_stream_handler(
        &self,
        stream_name: &str,
        handler: Arc<dyn StreamHandler>,
    ) -> Result<(), ChannelError> {
        self.handlers
            .lock()
            .unwrap()
            .insert(stream_name.to_string(), handler);
        Ok(())
    }
}
