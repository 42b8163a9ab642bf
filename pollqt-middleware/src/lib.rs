//! pollqt-middleware
//!
//! Layers that sit between the poller and its collaborators: a shared rate gate in
//! front of the transport and a deduplicating wrapper in front of output sinks.

mod dedup;
mod gated_transport;
mod rate_gate;

pub use crate::dedup::{DeduplicatingSink, Deduplicator};
pub use crate::gated_transport::RateGatedTransport;
pub use crate::rate_gate::RateGate;
