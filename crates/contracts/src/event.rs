//! Event record model
//!
//! The wire unit handed to the application layer: a string-keyed map of
//! scalar/byte-array values with a mandatory `"event"` discriminator, matching
//! the platform channel codec's value space.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::Serialize;

/// Discriminator key present in every event record
pub const EVENT_KEY: &str = "event";

/// Channel lifecycle transition
pub const EVENT_STATE_CHANGED: &str = "dataChannelStateChanged";

/// Flow-control notification
pub const EVENT_BUFFERED_AMOUNT_CHANGE: &str = "dataChannelBufferedAmountChange";

/// Inbound payload
pub const EVENT_RECEIVE_MESSAGE: &str = "dataChannelReceiveMessage";

/// Batch envelope wrapping two or more leaf records
pub const EVENT_BATCH: &str = "dataChannelEventsBatch";

/// A value carried in an event record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventValue {
    /// UTF-8 string
    String(String),
    /// Signed 32-bit integer
    Int(i32),
    /// Signed 64-bit integer
    Long(i64),
    /// Raw byte payload
    Bytes(Bytes),
    /// Nested record
    Record(EventRecord),
    /// Ordered sequence
    List(Vec<EventValue>),
}

impl EventValue {
    /// View as a record, if this value is one
    pub fn as_record(&self) -> Option<&EventRecord> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }
}

impl From<EventRecord> for EventValue {
    fn from(record: EventRecord) -> Self {
        Self::Record(record)
    }
}

/// String-keyed event record with typed insertion helpers
///
/// Every record produced by the encoder carries its shape name under
/// [`EVENT_KEY`]; consumers dispatch on that value.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct EventRecord {
    entries: BTreeMap<String, EventValue>,
}

impl EventRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record pre-populated with its `"event"` discriminator
    pub fn for_event(event_name: impl Into<String>) -> Self {
        let mut record = Self::new();
        record.put_string(EVENT_KEY, event_name);
        record
    }

    /// Insert a string value
    pub fn put_string(&mut self, key: &str, value: impl Into<String>) {
        self.entries
            .insert(key.to_string(), EventValue::String(value.into()));
    }

    /// Insert a 32-bit integer value
    pub fn put_int(&mut self, key: &str, value: i32) {
        self.entries.insert(key.to_string(), EventValue::Int(value));
    }

    /// Insert a 64-bit integer value
    pub fn put_long(&mut self, key: &str, value: i64) {
        self.entries
            .insert(key.to_string(), EventValue::Long(value));
    }

    /// Insert a byte payload
    pub fn put_bytes(&mut self, key: &str, value: Bytes) {
        self.entries
            .insert(key.to_string(), EventValue::Bytes(value));
    }

    /// Insert an ordered sequence
    pub fn put_list(&mut self, key: &str, values: Vec<EventValue>) {
        self.entries
            .insert(key.to_string(), EventValue::List(values));
    }

    /// Look up a value by key
    pub fn get(&self, key: &str) -> Option<&EventValue> {
        self.entries.get(key)
    }

    /// The record's shape name, if the discriminator is present and a string
    pub fn event_name(&self) -> Option<&str> {
        self.get_str(EVENT_KEY)
    }

    /// Typed lookup: string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(EventValue::String(value)) => Some(value),
            _ => None,
        }
    }

    /// Typed lookup: 32-bit integer
    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.entries.get(key) {
            Some(EventValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    /// Typed lookup: 64-bit integer
    pub fn get_long(&self, key: &str) -> Option<i64> {
        match self.entries.get(key) {
            Some(EventValue::Long(value)) => Some(*value),
            _ => None,
        }
    }

    /// Typed lookup: byte payload
    pub fn get_bytes(&self, key: &str) -> Option<&Bytes> {
        match self.entries.get(key) {
            Some(EventValue::Bytes(value)) => Some(value),
            _ => None,
        }
    }

    /// Typed lookup: ordered sequence
    pub fn get_list(&self, key: &str) -> Option<&[EventValue]> {
        match self.entries.get(key) {
            Some(EventValue::List(values)) => Some(values),
            _ => None,
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the record has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
