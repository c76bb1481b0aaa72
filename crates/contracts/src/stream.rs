//! Event stream contracts - the messenger-facing seam
//!
//! The application layer consumes events through named streams; the plumbing
//! that carries them across the process boundary stays behind
//! [`EventChannelRegistry`].

use std::sync::Arc;

use crate::{ChannelError, EventSink, EventValue};

/// Prefix of every data-channel event stream name
pub const DATA_CHANNEL_STREAM_PREFIX: &str = "FlutterWebRTC/dataChannelEvent";

/// Stream name for a data channel
///
/// The peer connection id and channel id are concatenated with no delimiter.
/// Consumers resolve streams by this exact string, so the format is frozen.
pub fn data_channel_stream_name(peer_connection_id: &str, channel_id: &str) -> String {
    format!("{DATA_CHANNEL_STREAM_PREFIX}{peer_connection_id}{channel_id}")
}

/// Handler for a named event stream
pub trait StreamHandler: Send + Sync {
    /// A consumer attached; `sink` accepts events from now on
    fn on_listen(&self, arguments: Option<EventValue>, sink: Arc<dyn EventSink>);

    /// The consumer detached
    fn on_cancel(&self, arguments: Option<EventValue>);
}

/// Registers stream handlers with the application-layer messenger
pub trait EventChannelRegistry: Send + Sync {
    /// Bind `handler` to the stream named `stream_name`
    ///
    /// # Errors
    /// Returns a registration error when the messenger refuses the stream.
    fn set_stream_handler(
        &self,
        stream_name: &str,
        handler: Arc<dyn StreamHandler>,
    ) -> Result<(), ChannelError>;
}
