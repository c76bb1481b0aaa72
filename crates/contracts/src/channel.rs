//! Data-channel side contracts
//!
//! Narrow view over the native data channel: the observer callbacks it fires
//! and the handle the encoder reads channel state from. The native library
//! itself stays behind these traits.

use bytes::Bytes;

/// Data channel lifecycle state as reported by the native library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataChannelState {
    Connecting,
    Open,
    Closing,
    Closed,
    /// Reported by the library but not recognized by this bridge
    Unspecified,
}

impl DataChannelState {
    /// Wire string for the state
    ///
    /// Unrecognized states pass through as the empty string; the consumer
    /// still sees the transition.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Unspecified => "",
        }
    }
}

/// Inbound message payload with its binary flag
#[derive(Debug, Clone, PartialEq)]
pub struct MessageBuffer {
    /// True for binary frames, false for UTF-8 text frames
    pub binary: bool,
    /// Payload bytes. Ownership is taken at the boundary that builds the
    /// buffer, so the native storage may be reused once the callback returns.
    pub data: Bytes,
}

impl MessageBuffer {
    /// Build a binary buffer
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self {
            binary: true,
            data: data.into(),
        }
    }

    /// Build a text buffer from a UTF-8 string
    pub fn text(data: impl Into<String>) -> Self {
        Self {
            binary: false,
            data: Bytes::from(data.into()),
        }
    }
}

/// Read side of the native data channel used by the event encoder
pub trait DataChannelHandle: Send + Sync {
    /// Numeric channel id assigned by the native library
    fn id(&self) -> i32;

    /// Current lifecycle state
    fn state(&self) -> DataChannelState;

    /// Total bytes currently buffered for transmission, nonnegative
    fn buffered_amount(&self) -> i64;
}

/// Observer callbacks fired by the native data channel
///
/// Callbacks may arrive on any library thread, possibly concurrently, and
/// must never block on downstream progress. The new state for
/// `on_state_change` is read out-of-band from the channel handle.
pub trait DataChannelEvents: Send + Sync {
    /// A lifecycle transition occurred
    fn on_state_change(&self);

    /// The outbound buffer level changed by `changed_amount` bytes
    fn on_buffered_amount_change(&self, changed_amount: i64);

    /// A message arrived
    fn on_message(&self, buffer: MessageBuffer);
}
