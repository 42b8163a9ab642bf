use std::sync::Arc;

use pollqt_core::{Backoff, PollError, Snapshot};
use tokio_util::sync::CancellationToken;

use crate::core::{PollState, Poller};
use crate::session::poll_cycle;

impl Poller {
    /// Run a single cycle under the configured deadline, without retrying.
    ///
    /// # Errors
    /// Returns the cycle's error, or `CycleTimeout` when the deadline passes first. A
    /// timed-out cycle is cancelled and left to finish in the background, where its
    /// outcome is only logged.
    pub async fn poll_once(&self) -> Result<Vec<Snapshot>, PollError> {
        let timeout = self.inner.cfg.cycle_timeout;
        let scope = CancellationToken::new();
        // Dropping this future cancels the cycle as well.
        let guard = scope.clone().drop_guard();
        let mut handle = tokio::spawn(poll_cycle(Arc::clone(&self.inner), scope.clone()));

        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(joined) => {
                guard.disarm();
                joined.map_err(|e| PollError::Data(format!("poll cycle task failed: {e}")))?
            }
            Err(_) => {
                scope.cancel();
                guard.disarm();
                // Wait out a credential commit that may already hold the lock; any later
                // commit attempt observes the cancellation.
                drop(self.inner.credential.lock().await);
                self.inner.force_transition(PollState::Cancelled);

                let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                #[cfg(feature = "tracing")]
                tracing::warn!(timeout_ms, "poll cycle timed out; cancelled");

                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    let outcome = handle.await;
                    #[cfg(feature = "tracing")]
                    match &outcome {
                        Ok(Ok(snapshots)) => tracing::info!(
                            accounts = snapshots.len(),
                            "abandoned cycle finished late; result discarded"
                        ),
                        Ok(Err(e)) => tracing::info!(error = %e, "abandoned cycle ended"),
                        Err(e) => tracing::warn!(error = %e, "abandoned cycle task failed"),
                    }
                    drop(outcome);
                    inner.record_abandoned();
                });

                Err(PollError::CycleTimeout { timeout_ms })
            }
        }
    }

    /// Run cycles until one succeeds, waiting out the backoff policy between failures.
    ///
    /// Every attempt is a fresh cycle with its own cancellation scope. The backoff
    /// budget is per call.
    ///
    /// # Errors
    /// Returns `RetriesExhausted` once the retry budget is spent, and non-retryable
    /// errors such as `CredentialUnavailable` immediately.
    pub async fn poll_with_retry(&self) -> Result<Vec<Snapshot>, PollError> {
        let mut backoff = Backoff::new(self.inner.cfg.backoff);
        loop {
            #[cfg(feature = "tracing")]
            let started = tokio::time::Instant::now();
            let err = match self.poll_once().await {
                Ok(snapshots) => return Ok(snapshots),
                Err(e) if !e.is_retryable() => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(error = %e, "poll failed; not retrying");
                    return Err(e);
                }
                Err(e) => e,
            };

            let delay = match backoff.advance() {
                Ok(delay) => delay,
                Err(exhausted) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(error = %err, "{exhausted}");
                    return Err(exhausted);
                }
            };
            #[cfg(feature = "tracing")]
            tracing::warn!(
                error = %err,
                transient = err.is_transient(),
                attempt = backoff.attempt(),
                elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "poll cycle failed; backing off"
            );
            #[cfg(not(feature = "tracing"))]
            drop(err);
            self.inner.force_transition(PollState::BackingOff);
            tokio::time::sleep(delay).await;
        }
    }
}
