use async_trait::async_trait;
use pollqt_types::{PollError, Snapshot};

/// Destination for the snapshots produced by one poll cycle.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Human-readable sink name for logging.
    fn name(&self) -> &'static str;

    /// Accept one cycle's batch of snapshots.
    ///
    /// # Errors
    /// Returns `PollError::Sink` (or any other variant) when the batch could not be
    /// written. The dispatcher logs the failure and continues with the other sinks.
    async fn on_event(&self, snapshots: &[Snapshot]) -> Result<(), PollError>;
}
