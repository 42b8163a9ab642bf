use std::time::Duration;

use pollqt::{Credential, PollError, PollState, PollerConfig};
use pollqt_core::HttpResponse;
use pollqt_mock::fixtures::{ACCOUNTS_PATH, LOGIN_PATH, balances_path, login};
use pollqt_mock::{MockBehavior, script_healthy_upstream};
use tokio::time::Instant;

use crate::helpers::{ACCOUNT, harness_with, healthy, logged_in, ok_balances, test_config};

#[tokio::test(start_paused = true)]
async fn hanging_cycle_times_out_and_is_cancelled() {
    let cfg = PollerConfig {
        cycle_timeout: Duration::from_secs(5),
        ..test_config()
    };
    let h = harness_with(logged_in(), cfg).await;
    script_healthy_upstream(&h.upstream, &[ACCOUNT]).await;
    h.upstream.set(ACCOUNTS_PATH, MockBehavior::Hang).await;

    let started = Instant::now();
    let err = h.poller.poll_once().await.unwrap_err();
    assert_eq!(err, PollError::CycleTimeout { timeout_ms: 5_000 });
    assert!(err.is_retryable());
    assert_eq!(started.elapsed(), Duration::from_secs(5));
    assert_eq!(h.poller.state(), PollState::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn slow_cycle_is_abandoned_and_a_fresh_one_succeeds() {
    let h = healthy(logged_in(), &[ACCOUNT]).await;
    let balances = balances_path(ACCOUNT);
    h.upstream
        .set(
            &balances,
            MockBehavior::Delay(Duration::from_secs(90), ok_balances()),
        )
        .await;
    h.upstream
        .push(&balances, MockBehavior::Return(ok_balances()))
        .await;

    let started = Instant::now();
    let snapshots = h.poller.poll_with_retry().await.expect("second cycle succeeds");
    assert_eq!(snapshots.len(), 1);
    // 60s deadline plus the first 200ms backoff.
    assert_eq!(started.elapsed(), Duration::from_millis(60_200));
    assert_eq!(h.upstream.count(ACCOUNTS_PATH).await, 2);
    assert_eq!(h.poller.state(), PollState::Authenticated);
    assert_eq!(h.poller.abandoned_cycles_observed(), 0);

    // The abandoned cycle's request completes at 90s and the cycle stops there.
    tokio::time::sleep(Duration::from_secs(40)).await;
    assert_eq!(h.poller.abandoned_cycles_observed(), 1);
    assert_eq!(h.upstream.count(&balances).await, 2);
    assert_eq!(h.poller.state(), PollState::Authenticated);
    assert!(h.store.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn late_login_from_an_abandoned_cycle_never_overwrites_the_credential() {
    let h = healthy(Credential::bootstrap("refresh-0"), &[ACCOUNT]).await;
    h.upstream
        .set(
            LOGIN_PATH,
            MockBehavior::Delay(
                Duration::from_secs(90),
                HttpResponse::ok(login::body("stale-access", "stale-refresh")),
            ),
        )
        .await;
    h.upstream
        .push(
            LOGIN_PATH,
            MockBehavior::Return(HttpResponse::ok(login::body("access-1", "refresh-2"))),
        )
        .await;

    h.poller.poll_with_retry().await.expect("second cycle succeeds");
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.poller.abandoned_cycles_observed(), 1);

    let cred = h.poller.credential().await;
    assert_eq!(cred.access_token.as_deref(), Some("access-1"));
    assert_eq!(cred.refresh_token.as_deref(), Some("refresh-2"));
    let writes = h.store.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0], cred);
    assert_eq!(h.poller.state(), PollState::Authenticated);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_poll_cancels_the_cycle() {
    let h = healthy(logged_in(), &[ACCOUNT]).await;
    let balances = balances_path(ACCOUNT);
    h.upstream
        .set(
            &balances,
            MockBehavior::Delay(Duration::from_secs(10), ok_balances()),
        )
        .await;

    let outcome = tokio::time::timeout(Duration::from_secs(1), h.poller.poll_once()).await;
    assert!(outcome.is_err());

    tokio::time::sleep(Duration::from_secs(20)).await;
    // The cycle stopped after the slow balances request instead of moving on.
    assert_eq!(h.upstream.count(&balances_path(ACCOUNT)).await, 1);
    assert_eq!(
        h.upstream
            .count(&pollqt_mock::fixtures::positions_path(ACCOUNT))
            .await,
        0
    );
}

#[tokio::test(start_paused = true)]
async fn hanging_token_store_cannot_hold_the_cycle_past_its_deadline() {
    let cfg = PollerConfig {
        cycle_timeout: Duration::from_secs(5),
        ..test_config()
    };
    let h = harness_with(Credential::bootstrap("refresh-0"), cfg).await;
    script_healthy_upstream(&h.upstream, &[ACCOUNT]).await;
    h.store.set_hang_writes(true);

    let started = Instant::now();
    let outcome = tokio::time::timeout(Duration::from_secs(600), h.poller.poll_once())
        .await
        .expect("poll_once returns at the cycle deadline");

    assert_eq!(outcome.unwrap_err(), PollError::CycleTimeout { timeout_ms: 5_000 });
    assert_eq!(started.elapsed(), Duration::from_secs(5));
    assert_eq!(h.store.writes().len(), 1);
    // The login committed before the deadline; only the store write is stuck.
    assert_eq!(
        h.poller.credential().await.access_token.as_deref(),
        Some("access-1")
    );
}
