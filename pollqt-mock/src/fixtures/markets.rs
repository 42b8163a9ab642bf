use chrono::{DateTime, FixedOffset};
use serde_json::json;

/// Schedule listing a single market with the given session bounds.
#[must_use]
pub fn schedule(name: &str, start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> String {
    json!({
        "markets": [{
            "name": name,
            "tradingVenues": [name],
            "defaultTradingVenue": name,
            "startTime": start.to_rfc3339(),
            "endTime": end.to_rfc3339(),
        }]
    })
    .to_string()
}
