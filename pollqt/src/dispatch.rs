use std::sync::Arc;

use futures::future::join_all;
use pollqt_core::{OutputSink, PollError, Snapshot};
use pollqt_middleware::{DeduplicatingSink, Deduplicator};

/// Explicit list of output sinks invoked once per successful cycle.
#[derive(Clone, Default)]
pub struct Dispatcher {
    sinks: Vec<Arc<dyn OutputSink>>,
}

impl Dispatcher {
    /// Dispatcher with no sinks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink that receives every batch unfiltered.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Register a sink behind its own deduplicating store.
    #[must_use]
    pub fn with_deduplicated_sink(self, sink: Arc<dyn OutputSink>) -> Self {
        self.with_sink(Arc::new(DeduplicatingSink::new(sink)))
    }

    /// Register a sink behind a store shared with other sinks.
    #[must_use]
    pub fn with_shared_dedup(self, sink: Arc<dyn OutputSink>, store: Arc<Deduplicator>) -> Self {
        self.with_sink(Arc::new(DeduplicatingSink::with_store(sink, store)))
    }

    /// Number of registered sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// True when no sink is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Hand `snapshots` to every sink concurrently.
    ///
    /// A failing sink does not affect the others. Failures are logged and returned
    /// with the sink name, in registration order.
    pub async fn dispatch(&self, snapshots: &[Snapshot]) -> Vec<(&'static str, PollError)> {
        let results = join_all(self.sinks.iter().map(|sink| async move {
            (sink.name(), sink.on_event(snapshots).await)
        }))
        .await;

        results
            .into_iter()
            .filter_map(|(name, r)| match r {
                Ok(()) => None,
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(sink = name, error = %e, "output sink failed");
                    Some((name, e))
                }
            })
            .collect()
    }
}
