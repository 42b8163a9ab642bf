#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use pollqt::{Credential, Poller, PollerConfig, RateLimitConfig};
use pollqt_core::HttpResponse;
use pollqt_mock::fixtures::{self, accounts};
use pollqt_mock::{
    MemoryTokenStore, ScriptedTransport, TransportController, authenticated_credential,
    script_healthy_upstream,
};

pub const ACCOUNT: &str = "26598145";
pub const OTHER_ACCOUNT: &str = "51443213";

/// Poller wired to a scripted upstream and an in-memory token store.
pub struct Harness {
    pub poller: Poller,
    pub upstream: TransportController,
    pub store: Arc<MemoryTokenStore>,
}

/// Configuration tuned for tests: generous local budget, mock login endpoint.
pub fn test_config() -> PollerConfig {
    PollerConfig {
        rate_limit: RateLimitConfig {
            requests: 10_000,
            window: Duration::from_secs(1),
        },
        login_url: fixtures::LOGIN_URL.to_string(),
        ..PollerConfig::default()
    }
}

pub fn logged_in() -> Credential {
    authenticated_credential("access-0", "refresh-0")
}

pub async fn harness_with(credential: Credential, cfg: PollerConfig) -> Harness {
    let (transport, upstream) = ScriptedTransport::new_with_controller("scripted");
    let store = Arc::new(MemoryTokenStore::with_credential(credential));
    let poller = Poller::builder()
        .config(cfg)
        .transport(transport)
        .token_store(store.clone())
        .build()
        .await
        .expect("poller builds");
    Harness {
        poller,
        upstream,
        store,
    }
}

/// Harness with a healthy upstream serving `numbers`.
pub async fn healthy(credential: Credential, numbers: &[&str]) -> Harness {
    let h = harness_with(credential, test_config()).await;
    script_healthy_upstream(&h.upstream, numbers).await;
    h
}

pub fn ok_balances() -> HttpResponse {
    HttpResponse::ok(accounts::balances(1_000.5))
}

pub fn status(code: u16) -> HttpResponse {
    HttpResponse::new(code, "")
}

pub fn rate_limited_until(unix_secs: i64) -> HttpResponse {
    HttpResponse::new(429, "").with_header("X-RateLimit-Reset", unix_secs.to_string())
}
