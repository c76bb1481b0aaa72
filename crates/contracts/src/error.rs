//! Layered error definitions
//!
//! Categorized by source: sink delivery / stream plumbing

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Sink delivery error
    #[error("sink '{sink_name}' delivery error: {message}")]
    SinkDelivery { sink_name: String, message: String },

    /// Event stream registration error
    #[error("stream '{stream_name}' registration error: {message}")]
    StreamRegistration {
        stream_name: String,
        message: String,
    },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ChannelError {
    /// Create a sink delivery error
    pub fn sink_delivery(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkDelivery {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create a stream registration error
    pub fn stream_registration(
        stream_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::StreamRegistration {
            stream_name: stream_name.into(),
            message: message.into(),
        }
    }
}
