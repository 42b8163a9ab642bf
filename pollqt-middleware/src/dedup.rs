//! Suppression of unchanged snapshots before they reach a sink.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use pollqt_core::{OutputSink, PollError, Snapshot};

/// Last emitted snapshot per account number.
///
/// A single store can back several [`DeduplicatingSink`]s. In that case the first sink
/// to see a new snapshot records it and every other sink sees the very same snapshot
/// again (equal timestamp), which is let through.
#[derive(Default)]
pub struct Deduplicator {
    last: Mutex<HashMap<String, Snapshot>>,
}

impl Deduplicator {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Snapshot>> {
        self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decide whether `snapshot` should be emitted, recording it when it is new data.
    ///
    /// Positions are compared in order and the balance structurally. A snapshot whose
    /// holdings match the stored one is emitted only when it carries the stored
    /// timestamp.
    pub fn should_emit(&self, snapshot: &Snapshot) -> bool {
        let mut last = self.lock();
        match last.entry(snapshot.account.number.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(snapshot.clone());
                true
            }
            Entry::Occupied(mut slot) => {
                let stored = slot.get();
                if stored.same_holdings(snapshot) {
                    stored.timestamp == snapshot.timestamp
                } else {
                    slot.insert(snapshot.clone());
                    true
                }
            }
        }
    }

    /// Keep only the snapshots [`should_emit`](Self::should_emit) lets through, in order.
    pub fn filter(&self, snapshots: &[Snapshot]) -> Vec<Snapshot> {
        snapshots
            .iter()
            .filter(|s| self.should_emit(s))
            .cloned()
            .collect()
    }

    /// Last emitted snapshot for `account_number`.
    #[must_use]
    pub fn last_emitted(&self, account_number: &str) -> Option<Snapshot> {
        self.lock().get(account_number).cloned()
    }

    /// Number of accounts tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when no account has been seen yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Sink wrapper that drops snapshots whose holdings did not change since the last
/// emission. Batches that end up empty are not forwarded.
pub struct DeduplicatingSink {
    inner: Arc<dyn OutputSink>,
    store: Arc<Deduplicator>,
}

impl DeduplicatingSink {
    /// Wrap `inner` with a private store.
    pub fn new(inner: Arc<dyn OutputSink>) -> Self {
        Self::with_store(inner, Arc::new(Deduplicator::new()))
    }

    /// Wrap `inner` with a store that may be shared with other sinks.
    pub fn with_store(inner: Arc<dyn OutputSink>, store: Arc<Deduplicator>) -> Self {
        Self { inner, store }
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<Deduplicator> {
        &self.store
    }
}

#[async_trait]
impl OutputSink for DeduplicatingSink {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn on_event(&self, snapshots: &[Snapshot]) -> Result<(), PollError> {
        let fresh = self.store.filter(snapshots);
        #[cfg(feature = "tracing")]
        for s in snapshots {
            if !fresh.iter().any(|f| f.account.number == s.account.number) {
                tracing::info!(
                    sink = self.inner.name(),
                    account = %format_args!("{}-{}", s.account.kind, s.account.number),
                    timestamp = %s.timestamp,
                    "no change; skipping"
                );
            }
        }
        if fresh.is_empty() {
            return Ok(());
        }
        self.inner.on_event(&fresh).await
    }
}
