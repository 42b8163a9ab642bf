use std::time::Duration;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use pollqt::PollerConfig;
use pollqt_mock::fixtures::{MARKETS_PATH, markets};
use pollqt_mock::script_healthy_upstream;

use crate::helpers::{ACCOUNT, Harness, harness_with, logged_in, test_config};

fn utc(day: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, h, m, 0).unwrap()
}

async fn tsx_harness() -> Harness {
    let cfg = PollerConfig {
        market: Some("TSX".into()),
        ..test_config()
    };
    let h = harness_with(logged_in(), cfg).await;
    script_healthy_upstream(&h.upstream, &[ACCOUNT]).await;
    let et = FixedOffset::west_opt(5 * 3600).unwrap();
    h.upstream
        .respond(
            MARKETS_PATH,
            markets::schedule(
                "TSX",
                et.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap(),
                et.with_ymd_and_hms(2024, 1, 15, 16, 0, 0).unwrap(),
            ),
        )
        .await;
    h
}

#[tokio::test(start_paused = true)]
async fn waits_for_the_open_and_caches_the_schedule_for_the_day() {
    let h = tsx_harness().await;

    assert_eq!(
        h.poller.market_delay(utc(15, 13, 0)).await,
        Some(Duration::from_secs(90 * 60))
    );
    assert_eq!(h.poller.market_delay(utc(15, 15, 0)).await, None);
    assert_eq!(h.upstream.count(MARKETS_PATH).await, 1);

    // A new UTC day refreshes the schedule.
    h.poller.market_delay(utc(16, 15, 0)).await;
    assert_eq!(h.upstream.count(MARKETS_PATH).await, 2);
}

#[tokio::test(start_paused = true)]
async fn wait_after_close_is_capped_at_the_next_utc_day() {
    let h = tsx_harness().await;
    // 22:00 UTC, after the 21:00 UTC close: next open is 14:30 UTC tomorrow, but the
    // schedule is refreshed at midnight first.
    assert_eq!(
        h.poller.market_delay(utc(15, 22, 0)).await,
        Some(Duration::from_secs(2 * 60 * 60))
    );
}

#[tokio::test(start_paused = true)]
async fn unavailable_schedule_never_blocks() {
    let h = harness_with(
        logged_in(),
        PollerConfig {
            market: Some("TSX".into()),
            ..test_config()
        },
    )
    .await;
    // Markets endpoint unscripted: 404.
    assert_eq!(h.poller.market_delay(utc(15, 13, 0)).await, None);
    assert_eq!(h.upstream.count(MARKETS_PATH).await, 1);
}

#[tokio::test(start_paused = true)]
async fn unknown_market_never_blocks() {
    let cfg = PollerConfig {
        market: Some("NYSE".into()),
        ..test_config()
    };
    let h = harness_with(logged_in(), cfg).await;
    script_healthy_upstream(&h.upstream, &[ACCOUNT]).await;
    let et = FixedOffset::west_opt(5 * 3600).unwrap();
    h.upstream
        .respond(
            MARKETS_PATH,
            markets::schedule(
                "TSX",
                et.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap(),
                et.with_ymd_and_hms(2024, 1, 15, 16, 0, 0).unwrap(),
            ),
        )
        .await;
    assert_eq!(h.poller.market_delay(utc(15, 13, 0)).await, None);
}

#[tokio::test(start_paused = true)]
async fn no_configured_market_issues_no_request() {
    let h = harness_with(logged_in(), test_config()).await;
    assert_eq!(h.poller.market_delay(utc(15, 13, 0)).await, None);
    assert!(h.upstream.requests().await.is_empty());
}
