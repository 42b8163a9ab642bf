//! Configuration types shared across the poller and its middleware.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default OAuth token endpoint used for the refresh-token exchange.
pub const DEFAULT_LOGIN_URL: &str = "https://login.questrade.com/oauth2/token";

/// Exponential backoff configuration for retrying failed poll cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Number of retries allowed before the tick is abandoned.
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds; doubles on every further failure.
    pub base_delay_ms: u64,
    /// Upper bound on any single delay in milliseconds.
    pub max_delay_ms: u64,
    /// Random jitter percentage [0, 100] added to each delay. The cap still applies.
    pub jitter_percent: u8,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            base_delay_ms: 200,
            max_delay_ms: 120_000,
            jitter_percent: 0,
        }
    }
}

/// Local request budget enforced by the rate gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum number of requests admitted within a single window.
    pub requests: u32,
    /// Length of the admission window.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests: 5,
            window: Duration::from_secs(1),
        }
    }
}

/// Global configuration for the `Poller`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Retry policy applied between failed cycles.
    pub backoff: BackoffConfig,
    /// Local request budget shared by every outbound request.
    pub rate_limit: RateLimitConfig,
    /// Hard deadline for a single poll cycle.
    pub cycle_timeout: Duration,
    /// Pause between successful ticks of the run loop.
    pub poll_interval: Duration,
    /// How far back the activity request reaches from the cycle timestamp.
    pub activity_lookback: Duration,
    /// OAuth token endpoint for the refresh-token exchange.
    pub login_url: String,
    /// Market whose trading hours gate polling. `None` polls around the clock.
    pub market: Option<String>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cycle_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(60),
            activity_lookback: Duration::from_secs(24 * 60 * 60),
            login_url: DEFAULT_LOGIN_URL.to_string(),
            market: None,
        }
    }
}
