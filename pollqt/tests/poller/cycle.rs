use chrono::{DateTime, TimeDelta};
use pollqt::{PollError, PollState};
use pollqt_mock::fixtures::{
    ACCOUNTS_PATH, accounts, activities_path, balances_path, positions_path,
};

use crate::helpers::{ACCOUNT, OTHER_ACCOUNT, healthy, logged_in};

#[tokio::test(start_paused = true)]
async fn one_snapshot_per_account_sharing_the_cycle_timestamp() {
    let h = healthy(logged_in(), &[ACCOUNT, OTHER_ACCOUNT]).await;

    let snapshots = h.poller.poll_once().await.expect("cycle succeeds");

    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0].account.number, ACCOUNT);
    assert_eq!(snapshots[1].account.number, OTHER_ACCOUNT);
    assert_eq!(snapshots[0].timestamp, snapshots[1].timestamp);
    assert_eq!(snapshots[0].positions.len(), 1);
    assert_eq!(snapshots[0].positions[0].symbol, "THI.TO");
    assert_eq!(snapshots[0].activities.len(), 1);
    assert_eq!(h.poller.state(), PollState::Authenticated);
}

#[tokio::test(start_paused = true)]
async fn requests_follow_account_order() {
    let h = healthy(logged_in(), &[ACCOUNT, OTHER_ACCOUNT]).await;
    h.poller.poll_once().await.expect("cycle succeeds");

    let paths = h.upstream.paths().await;
    assert_eq!(
        paths,
        vec![
            ACCOUNTS_PATH.to_string(),
            balances_path(ACCOUNT),
            positions_path(ACCOUNT),
            activities_path(ACCOUNT),
            balances_path(OTHER_ACCOUNT),
            positions_path(OTHER_ACCOUNT),
            activities_path(OTHER_ACCOUNT),
        ]
    );
    for req in h.upstream.requests().await {
        assert_eq!(req.header("authorization"), Some("Bearer access-0"));
    }
}

#[tokio::test(start_paused = true)]
async fn activity_window_spans_the_lookback_and_ends_at_the_cycle_timestamp() {
    let h = healthy(logged_in(), &[ACCOUNT]).await;
    let snapshots = h.poller.poll_once().await.expect("cycle succeeds");

    let log = h.upstream.requests().await;
    let req = log
        .iter()
        .find(|r| r.url.path() == activities_path(ACCOUNT))
        .expect("activities requested");
    let start = DateTime::parse_from_rfc3339(&req.query("startTime").expect("startTime"))
        .expect("rfc3339 start");
    let end = DateTime::parse_from_rfc3339(&req.query("endTime").expect("endTime"))
        .expect("rfc3339 end");

    assert_eq!(end - start, TimeDelta::hours(24));
    // Whole seconds on the wire.
    assert_eq!(end.timestamp(), snapshots[0].timestamp.timestamp());
}

#[tokio::test(start_paused = true)]
async fn missing_combined_balance_fails_the_cycle() {
    let h = healthy(logged_in(), &[ACCOUNT]).await;
    h.upstream
        .respond(&balances_path(ACCOUNT), accounts::balances_without_combined())
        .await;

    let err = h.poller.poll_once().await.unwrap_err();
    assert!(matches!(err, PollError::Data(_)));
    assert!(err.is_retryable());
    assert_eq!(h.upstream.count(&positions_path(ACCOUNT)).await, 0);
}

#[tokio::test(start_paused = true)]
async fn malformed_account_list_is_a_data_error() {
    let h = healthy(logged_in(), &[ACCOUNT]).await;
    h.upstream.respond(ACCOUNTS_PATH, "not json").await;

    let err = h.poller.poll_once().await.unwrap_err();
    match err {
        PollError::Data(msg) => assert!(msg.starts_with("accounts:"), "{msg}"),
        other => panic!("expected data error, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn unexpected_status_names_the_endpoint() {
    let h = healthy(logged_in(), &[ACCOUNT]).await;
    h.upstream
        .set(
            &positions_path(ACCOUNT),
            pollqt_mock::MockBehavior::Return(crate::helpers::status(500)),
        )
        .await;

    let err = h.poller.poll_once().await.unwrap_err();
    assert_eq!(err, PollError::unexpected_status("positions", 500));
}

#[tokio::test(start_paused = true)]
async fn empty_account_list_yields_an_empty_batch() {
    let h = healthy(logged_in(), &[]).await;
    let snapshots = h.poller.poll_once().await.expect("cycle succeeds");
    assert!(snapshots.is_empty());
    assert_eq!(h.upstream.count(ACCOUNTS_PATH).await, 1);
}
