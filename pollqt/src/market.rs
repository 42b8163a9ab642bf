//! Optional trading-hours gate.
//!
//! The market schedule is fetched at most once per UTC day. A schedule that cannot be
//! obtained never blocks polling.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use pollqt_core::MarketsResponse;
use tokio_util::sync::CancellationToken;

use crate::core::Poller;

pub(crate) struct MarketCache {
    day: NaiveDate,
    schedule: MarketsResponse,
}

/// How long to sleep before `market` opens, or `None` when polling may proceed now.
///
/// The listed session is assumed to repeat daily: once it has closed, the wait runs
/// to the same opening time on the following day. Unknown markets never wait.
#[must_use]
pub fn market_wait(
    schedule: &MarketsResponse,
    market: &str,
    now: DateTime<Utc>,
) -> Option<Duration> {
    let m = schedule.find(market)?;
    let mut start = m.start_time.with_timezone(&Utc);
    let mut end = m.end_time.with_timezone(&Utc);
    if end <= start {
        return None;
    }
    while end <= now {
        start += TimeDelta::days(1);
        end += TimeDelta::days(1);
    }
    if now < start {
        (start - now).to_std().ok()
    } else {
        None
    }
}

/// Time left until the next UTC midnight.
fn until_next_utc_day(now: DateTime<Utc>) -> Duration {
    let next = now
        .date_naive()
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc());
    next.and_then(|n| (n - now).to_std().ok())
        .unwrap_or(Duration::from_secs(24 * 60 * 60))
}

impl Poller {
    /// How long the run loop should sleep before polling, according to the configured
    /// market's hours. Never longer than the time to the next UTC day, when the
    /// schedule is refreshed.
    pub async fn market_delay(&self, now: DateTime<Utc>) -> Option<Duration> {
        let market = self.inner.cfg.market.as_deref()?;
        let today = now.date_naive();

        let cached = {
            let guard = self
                .inner
                .markets
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            guard
                .as_ref()
                .filter(|c| c.day == today)
                .map(|c| market_wait(&c.schedule, market, now))
        };
        let wait = match cached {
            Some(wait) => wait,
            None => {
                let schedule = self.fetch_schedule().await?;
                let wait = market_wait(&schedule, market, now);
                *self
                    .inner
                    .markets
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(MarketCache {
                    day: today,
                    schedule,
                });
                wait
            }
        };
        wait.map(|w| w.min(until_next_utc_day(now)))
    }

    async fn fetch_schedule(&self) -> Option<MarketsResponse> {
        let scope = CancellationToken::new();
        let fetch = self
            .inner
            .fetch_json::<MarketsResponse>(&scope, "markets", "v1/markets", &[]);
        match tokio::time::timeout(self.inner.cfg.cycle_timeout, fetch).await {
            Ok(Ok(schedule)) => Some(schedule),
            Ok(Err(e)) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %e, "market schedule unavailable; polling anyway");
                #[cfg(not(feature = "tracing"))]
                drop(e);
                None
            }
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("market schedule request timed out; polling anyway");
                None
            }
        }
    }
}
