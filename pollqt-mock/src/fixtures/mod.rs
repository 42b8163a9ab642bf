//! Canned upstream payloads and the routes they answer on.

pub mod accounts;
pub mod login;
pub mod markets;

/// Login endpoint the fixtures script.
pub const LOGIN_URL: &str = "http://login.mock/oauth2/token";
/// API server handed out by [`login::body`].
pub const API_SERVER: &str = "http://api.mock/";

/// Path of [`LOGIN_URL`].
pub const LOGIN_PATH: &str = "/oauth2/token";
/// Account list route.
pub const ACCOUNTS_PATH: &str = "/v1/accounts";
/// Market schedule route.
pub const MARKETS_PATH: &str = "/v1/markets";

#[must_use]
pub fn balances_path(number: &str) -> String {
    format!("/v1/accounts/{number}/balances")
}

#[must_use]
pub fn positions_path(number: &str) -> String {
    format!("/v1/accounts/{number}/positions")
}

#[must_use]
pub fn activities_path(number: &str) -> String {
    format!("/v1/accounts/{number}/activities")
}
