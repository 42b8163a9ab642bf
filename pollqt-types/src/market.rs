use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Trading session of one market for the current day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    /// Market name, e.g. "TSX" or "NYSE".
    pub name: String,
    /// Regular session open.
    pub start_time: DateTime<FixedOffset>,
    /// Regular session close.
    pub end_time: DateTime<FixedOffset>,
}

/// `GET v1/markets`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MarketsResponse {
    pub markets: Vec<Market>,
}

impl MarketsResponse {
    /// Look up a market by name, ignoring ASCII case.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Market> {
        self.markets
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
    }
}
