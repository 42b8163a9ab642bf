use pollqt::{Credential, PollError, PollState};
use pollqt_mock::{MockBehavior, script_healthy_upstream};
use pollqt_mock::fixtures::{ACCOUNTS_PATH, LOGIN_PATH, balances_path, positions_path};

use crate::helpers::{ACCOUNT, healthy, logged_in, ok_balances, status};

#[tokio::test(start_paused = true)]
async fn unauthorized_balance_request_relogs_once_and_retries_only_that_request() {
    let h = healthy(logged_in(), &[ACCOUNT]).await;
    let balances = balances_path(ACCOUNT);
    h.upstream
        .set(&balances, MockBehavior::Return(status(401)))
        .await;
    h.upstream
        .push(&balances, MockBehavior::Return(ok_balances()))
        .await;

    let snapshots = h.poller.poll_once().await.expect("cycle succeeds");
    assert_eq!(snapshots.len(), 1);

    assert_eq!(h.upstream.count(LOGIN_PATH).await, 1);
    assert_eq!(h.upstream.count(ACCOUNTS_PATH).await, 1);
    assert_eq!(h.upstream.count(&balances).await, 2);

    let log = h.upstream.requests().await;
    let login_req = log
        .iter()
        .find(|r| r.url.path() == LOGIN_PATH)
        .expect("login issued");
    assert_eq!(login_req.query("grant_type").as_deref(), Some("refresh_token"));
    assert_eq!(login_req.query("refresh_token").as_deref(), Some("refresh-0"));

    let retried: Vec<_> = log.iter().filter(|r| r.url.path() == balances).collect();
    assert_eq!(retried[0].header("Authorization"), Some("Bearer access-0"));
    assert_eq!(retried[1].header("Authorization"), Some("Bearer access-1"));
}

#[tokio::test(start_paused = true)]
async fn invalidation_keeps_refresh_token_and_is_persisted() {
    let h = healthy(logged_in(), &[ACCOUNT]).await;
    let balances = balances_path(ACCOUNT);
    h.upstream
        .set(&balances, MockBehavior::Return(status(401)))
        .await;
    h.upstream
        .push(&balances, MockBehavior::Return(ok_balances()))
        .await;

    h.poller.poll_once().await.expect("cycle succeeds");

    let writes = h.store.writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0].access_token, None);
    assert_eq!(writes[0].refresh_token.as_deref(), Some("refresh-0"));
    assert_eq!(writes[1].access_token.as_deref(), Some("access-1"));
    assert_eq!(writes[1].refresh_token.as_deref(), Some("refresh-2"));
    assert_eq!(h.poller.credential().await, writes[1]);
}

#[tokio::test(start_paused = true)]
async fn second_consecutive_unauthorized_is_fatal_for_the_cycle() {
    let h = healthy(logged_in(), &[ACCOUNT]).await;
    let positions = positions_path(ACCOUNT);
    h.upstream
        .set(&positions, MockBehavior::Return(status(401)))
        .await;

    let err = h.poller.poll_once().await.unwrap_err();
    assert_eq!(err, PollError::unauthorized("positions"));
    assert!(err.is_retryable());
    assert_eq!(h.upstream.count(LOGIN_PATH).await, 1);
    assert_eq!(h.upstream.count(&positions).await, 2);

    // The rejected token is dropped, so the next cycle starts with a login.
    let cred = h.poller.credential().await;
    assert_eq!(cred.access_token, None);
    assert_eq!(cred.refresh_token.as_deref(), Some("refresh-2"));
    assert_eq!(h.poller.state(), PollState::NeedsLogin);
    assert_eq!(h.store.writes().len(), 3);
    assert_eq!(h.store.current(), Some(cred));

    h.upstream.clear_all().await;
    script_healthy_upstream(&h.upstream, &[ACCOUNT]).await;
    h.poller.poll_once().await.expect("next cycle succeeds");
    assert_eq!(h.upstream.paths().await[0], LOGIN_PATH);
}

#[tokio::test(start_paused = true)]
async fn bootstrap_credential_logs_in_before_first_request() {
    let h = healthy(Credential::bootstrap("refresh-0"), &[ACCOUNT]).await;
    assert_eq!(h.poller.state(), PollState::NeedsLogin);

    h.poller.poll_once().await.expect("cycle succeeds");

    let paths = h.upstream.paths().await;
    assert_eq!(paths[0], LOGIN_PATH);
    assert_eq!(paths[1], ACCOUNTS_PATH);
    assert_eq!(h.poller.state(), PollState::Authenticated);
    assert_eq!(
        h.store.current().and_then(|c| c.access_token).as_deref(),
        Some("access-1")
    );
}

#[tokio::test(start_paused = true)]
async fn failed_persist_still_updates_in_memory_credential() {
    let h = healthy(Credential::bootstrap("refresh-0"), &[ACCOUNT]).await;
    h.store.set_fail_writes(true);

    h.poller.poll_once().await.expect("persist failure is not fatal");

    assert_eq!(h.store.writes().len(), 1);
    assert_eq!(h.store.current(), Some(Credential::bootstrap("refresh-0")));
    assert_eq!(
        h.poller.credential().await.access_token.as_deref(),
        Some("access-1")
    );
}

#[tokio::test(start_paused = true)]
async fn login_without_rotated_refresh_token_keeps_the_old_one() {
    let h = healthy(Credential::bootstrap("refresh-0"), &[ACCOUNT]).await;
    h.upstream
        .respond(
            LOGIN_PATH,
            r#"{"access_token":"access-9","api_server":"http://api.mock/"}"#,
        )
        .await;

    h.poller.poll_once().await.expect("cycle succeeds");
    let cred = h.poller.credential().await;
    assert_eq!(cred.access_token.as_deref(), Some("access-9"));
    assert_eq!(cred.refresh_token.as_deref(), Some("refresh-0"));
}

#[tokio::test(start_paused = true)]
async fn rejected_refresh_token_is_unauthorized() {
    let h = healthy(Credential::bootstrap("expired"), &[ACCOUNT]).await;
    h.upstream
        .set(LOGIN_PATH, MockBehavior::Return(status(400)))
        .await;

    let err = h.poller.poll_once().await.unwrap_err();
    assert_eq!(err, PollError::unauthorized("login"));
    assert_eq!(h.upstream.count(ACCOUNTS_PATH).await, 0);
    assert!(h.store.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn login_response_without_api_server_is_a_data_error() {
    let h = healthy(Credential::bootstrap("refresh-0"), &[ACCOUNT]).await;
    h.upstream
        .respond(LOGIN_PATH, r#"{"access_token":"a","refresh_token":"r"}"#)
        .await;

    let err = h.poller.poll_once().await.unwrap_err();
    assert!(matches!(err, PollError::Data(_)));
}

#[tokio::test(start_paused = true)]
async fn missing_refresh_token_is_credential_unavailable() {
    let h = healthy(Credential::default(), &[ACCOUNT]).await;
    let err = h.poller.poll_with_retry().await.unwrap_err();
    assert!(matches!(err, PollError::CredentialUnavailable(_)));
    assert!(h.upstream.requests().await.is_empty());
}
