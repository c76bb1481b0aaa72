//! Reference sink implementations

mod json;
mod log;

pub use json::JsonSink;
pub use log::LogSink;
