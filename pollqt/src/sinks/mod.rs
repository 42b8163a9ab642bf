//! Concrete output sinks.

mod json_lines;
mod line_protocol;

pub use json_lines::JsonLinesSink;
pub use line_protocol::{LineProtocolSink, format_snapshot};
