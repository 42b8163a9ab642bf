//! pollqt-core
//!
//! Contracts between the polling engine and its collaborators, plus the retry schedule.
//!
//! - `transport`: the GET-with-headers primitive every request goes through.
//! - `token_store`: persistence of the OAuth credential.
//! - `sink`: destinations for each cycle's snapshots.
//! - `backoff`: exponential retry schedule with a retry budget.
//!
//! All traits are object-safe and used behind `Arc<dyn ...>`.
#![warn(missing_docs)]

/// Exponential retry schedule between failed poll cycles.
pub mod backoff;
/// Output sink contract.
pub mod sink;
/// Credential persistence contract.
pub mod token_store;
/// HTTP transport contract and response type.
pub mod transport;

pub use backoff::{Backoff, jitter_wait};
pub use sink::OutputSink;
pub use token_store::TokenStore;
pub use transport::{HttpResponse, Transport};

pub use pollqt_types::*;
