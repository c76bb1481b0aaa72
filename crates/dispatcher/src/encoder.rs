//! Event encoder - native callbacks to event records
//!
//! Pure and stateless: every upstream notification becomes exactly one
//! self-contained record. Encoding cannot fail; malformed upstream data maps
//! to a defensible default.

use contracts::{
    DataChannelHandle, EventRecord, EventValue, MessageBuffer, EVENT_BUFFERED_AMOUNT_CHANGE,
    EVENT_RECEIVE_MESSAGE, EVENT_STATE_CHANGED,
};

/// Encode a state-change notification
///
/// The state is read from the handle at encode time; transitions that outpace
/// the drain collapse to the latest observable state, matching the native
/// observer contract.
pub fn state_changed(channel: &dyn DataChannelHandle) -> EventValue {
    let mut record = EventRecord::for_event(EVENT_STATE_CHANGED);
    record.put_int("id", channel.id());
    record.put_string("state", channel.state().as_str());
    record.into()
}

/// Encode a buffered-amount change
///
/// Both amounts are nonnegative by the upstream contract; a negative value
/// indicates a library bug and fails fast.
pub fn buffered_amount_changed(channel: &dyn DataChannelHandle, changed_amount: i64) -> EventValue {
    let buffered_amount = channel.buffered_amount();
    assert!(
        buffered_amount >= 0,
        "channel {} reported negative buffered amount {buffered_amount}",
        channel.id()
    );
    assert!(
        changed_amount >= 0,
        "channel {} reported negative buffered-amount delta {changed_amount}",
        channel.id()
    );

    let mut record = EventRecord::for_event(EVENT_BUFFERED_AMOUNT_CHANGE);
    record.put_int("id", channel.id());
    record.put_long("bufferedAmount", buffered_amount);
    record.put_long("changedAmount", changed_amount);
    record.into()
}

/// Encode an inbound message
///
/// Binary payloads pass through verbatim. Text payloads decode as UTF-8 with
/// U+FFFD substituted for invalid sequences.
pub fn message_received(channel: &dyn DataChannelHandle, buffer: MessageBuffer) -> EventValue {
    let mut record = EventRecord::for_event(EVENT_RECEIVE_MESSAGE);
    record.put_int("id", channel.id());
    if buffer.binary {
        record.put_string("type", "binary");
        record.put_bytes("data", buffer.data);
    } else {
        record.put_string("type", "text");
        record.put_string("data", String::from_utf8_lossy(&buffer.data).into_owned());
    }
    record.into()
}
