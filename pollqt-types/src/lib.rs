//! Shared pollqt data model, configuration primitives and the workspace error type.

mod account;
mod config;
mod credential;
mod error;
mod market;

pub use account::{
    AccountRef, AccountsResponse, ActivitiesResponse, Activity, Balance, BalancesResponse,
    Position, PositionsResponse, Snapshot,
};
pub use config::{BackoffConfig, DEFAULT_LOGIN_URL, PollerConfig, RateLimitConfig};
pub use credential::Credential;
pub use error::PollError;
pub use market::{Market, MarketsResponse};
