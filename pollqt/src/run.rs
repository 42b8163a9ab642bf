use chrono::Utc;
use pollqt_core::PollError;
use tokio_util::sync::CancellationToken;

use crate::core::Poller;
use crate::dispatch::Dispatcher;

impl Poller {
    /// Poll forever: wait for the market (when configured), run a cycle with retries,
    /// dispatch the batch, then sleep for the poll interval.
    ///
    /// A tick that exhausts its retries is logged and the loop carries on.
    ///
    /// # Errors
    /// Returns `CredentialUnavailable` (or another non-retryable error) when polling
    /// cannot continue without operator intervention. Returns `Ok(())` once `shutdown`
    /// is cancelled.
    pub async fn run(
        &self,
        dispatcher: &Dispatcher,
        shutdown: CancellationToken,
    ) -> Result<(), PollError> {
        #[cfg(feature = "tracing")]
        tracing::info!(
            sinks = dispatcher.len(),
            interval_ms = u64::try_from(self.inner.cfg.poll_interval.as_millis()).unwrap_or(u64::MAX),
            market = self.inner.cfg.market.as_deref().unwrap_or("-"),
            "poll loop started"
        );

        loop {
            if let Some(wait) = self.market_delay(Utc::now()).await {
                #[cfg(feature = "tracing")]
                tracing::info!(
                    wait_s = wait.as_secs(),
                    "market closed; sleeping until it opens"
                );
                tokio::select! {
                    biased;
                    () = shutdown.cancelled() => break,
                    () = tokio::time::sleep(wait) => continue,
                }
            }

            let outcome = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                outcome = self.poll_with_retry() => outcome,
            };

            match outcome {
                Ok(snapshots) => {
                    let _failures = dispatcher.dispatch(&snapshots).await;
                }
                Err(e @ PollError::RetriesExhausted { .. }) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(error = %e, "giving up on this tick");
                    #[cfg(not(feature = "tracing"))]
                    drop(e);
                }
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(error = %e, "poll loop stopping");
                    return Err(e);
                }
            }

            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(self.inner.cfg.poll_interval) => {}
            }
        }

        #[cfg(feature = "tracing")]
        tracing::info!("poll loop stopped");
        Ok(())
    }
}
