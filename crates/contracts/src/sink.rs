//! EventSink trait - downstream delivery interface
//!
//! Defines the abstract interface for event consumers.

use crate::{ChannelError, EventValue};

/// Downstream single-consumer delivery endpoint
///
/// Accepts one value at a time: a leaf event record or a batch envelope.
/// Implementations may require a specific delivery thread; the dispatcher
/// wraps every attached sink so it tolerates calls from any thread.
pub trait EventSink: Send + Sync {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver one event value
    ///
    /// # Errors
    /// Returns a delivery error; the dispatcher logs it and moves on. Failed
    /// values are not redelivered.
    fn add(&self, event: EventValue) -> Result<(), ChannelError>;
}

/// Posts work onto a specific consumer thread
///
/// The platform layer supplies one per delivery thread (typically the UI
/// thread). Tasks must run in posting order on a single thread.
pub trait TaskRunner: Send + Sync {
    /// Enqueue `task` onto the consumer thread
    fn post(&self, task: Box<dyn FnOnce() + Send>);
}
