use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use pollqt_core::{
    AccountsResponse, ActivitiesResponse, BalancesResponse, PollError, PositionsResponse,
    Snapshot,
};
use tokio_util::sync::CancellationToken;

use crate::core::{PollState, PollerInner};

/// Run one full cycle: account list, then balances, positions and recent activity per
/// account. All snapshots of the cycle share one timestamp, taken once the account list
/// is known.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(name = "pollqt::cycle", skip_all)
)]
pub(crate) async fn poll_cycle(
    inner: Arc<PollerInner>,
    scope: CancellationToken,
) -> Result<Vec<Snapshot>, PollError> {
    let accounts: AccountsResponse = inner
        .fetch_json(&scope, "accounts", "v1/accounts", &[])
        .await?;
    let timestamp = Utc::now();
    let lookback = chrono::Duration::from_std(inner.cfg.activity_lookback)
        .map_err(|e| PollError::InvalidArg(format!("activity lookback: {e}")))?;
    let window = [
        (
            "startTime",
            (timestamp - lookback).to_rfc3339_opts(SecondsFormat::Secs, false),
        ),
        (
            "endTime",
            timestamp.to_rfc3339_opts(SecondsFormat::Secs, false),
        ),
    ];

    let mut snapshots = Vec::with_capacity(accounts.accounts.len());
    for account in accounts.accounts {
        let number = account.number.clone();

        let balances: BalancesResponse = inner
            .fetch_json(
                &scope,
                "balances",
                &format!("v1/accounts/{number}/balances"),
                &[],
            )
            .await?;
        let balance = balances
            .combined_balances
            .into_iter()
            .next()
            .ok_or_else(|| PollError::Data(format!("account {number}: no combined balance")))?;

        let positions: PositionsResponse = inner
            .fetch_json(
                &scope,
                "positions",
                &format!("v1/accounts/{number}/positions"),
                &[],
            )
            .await?;

        let activities: ActivitiesResponse = inner
            .fetch_json(
                &scope,
                "activities",
                &format!("v1/accounts/{number}/activities"),
                &window,
            )
            .await?;

        snapshots.push(Snapshot {
            timestamp,
            account,
            balance,
            positions: positions.positions,
            activities: activities.activities,
        });
    }

    inner.transition(&scope, PollState::Authenticated);
    #[cfg(feature = "tracing")]
    tracing::info!(accounts = snapshots.len(), %timestamp, "cycle complete");
    Ok(snapshots)
}
