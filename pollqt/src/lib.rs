//! pollqt periodically retrieves brokerage account data and hands normalized
//! snapshots to pluggable output sinks.
//!
//! Overview
//! - OAuth refresh-token lifecycle: the credential is loaded from a [`TokenStore`],
//!   replaced on every login and on every forced invalidation, and persisted
//!   best-effort.
//! - Every outbound request passes one shared [`RateGate`]. Upstream 429 answers with
//!   a reset time install a hold on the gate and the request is retried in place.
//! - A 401 invalidates the access token, logs in again and retries the rejected
//!   request once.
//! - [`Poller::poll_with_retry`] wraps each cycle in a hard timeout and retries failed
//!   cycles with exponential backoff. A timed-out cycle is cancelled and may never
//!   write the credential afterwards.
//! - [`Dispatcher`] hands each batch to its sinks; [`DeduplicatingSink`] suppresses
//!   accounts whose balance and positions did not change.
//!
//! Example
//! ```rust,ignore
//! use std::sync::Arc;
//! use pollqt::{Dispatcher, FileTokenStore, JsonLinesSink, Poller};
//! use pollqt_http::ReqwestTransport;
//! use tokio_util::sync::CancellationToken;
//!
//! let poller = Poller::builder()
//!     .transport(Arc::new(ReqwestTransport::new()?))
//!     .token_store(Arc::new(FileTokenStore::new("/var/lib/pollqt/token.json")))
//!     .market("TSX")
//!     .build()
//!     .await?;
//! let dispatcher = Dispatcher::new()
//!     .with_deduplicated_sink(Arc::new(JsonLinesSink::new("/var/lib/pollqt/out")));
//! poller.run(&dispatcher, CancellationToken::new()).await?;
//! ```
#![warn(missing_docs)]

pub(crate) mod core;
mod dispatch;
mod market;
mod retry;
mod run;
mod session;
mod sinks;
mod store;

pub use crate::core::{PollState, Poller, PollerBuilder};
pub use dispatch::Dispatcher;
pub use market::market_wait;
pub use sinks::{JsonLinesSink, LineProtocolSink, format_snapshot};
pub use store::FileTokenStore;

pub use pollqt_middleware::{DeduplicatingSink, Deduplicator, RateGate, RateGatedTransport};

// Re-export core types for convenience
pub use pollqt_core::{
    AccountRef, Activity, Backoff, BackoffConfig, Balance, Credential, HttpResponse, Market,
    MarketsResponse, OutputSink, PollError, PollerConfig, Position, RateLimitConfig, Snapshot,
    TokenStore, Transport,
};
