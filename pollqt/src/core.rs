use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use pollqt_core::{
    BackoffConfig, Credential, PollError, PollerConfig, RateLimitConfig, TokenStore, Transport,
};
use pollqt_middleware::{RateGate, RateGatedTransport};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::market::MarketCache;

/// Lifecycle state of the poller.
///
/// `NeedsLogin` and `Authenticated` describe the credential; `Polling` and
/// `BackingOff` describe the cycle in progress; `Cancelled` marks a cycle that was
/// abandoned on timeout and is left until the next retry starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollState {
    /// No usable access token; the next request performs the refresh-token exchange.
    NeedsLogin,
    /// Access token and API server are known.
    Authenticated,
    /// A cycle is issuing account requests.
    Polling,
    /// Waiting out a backoff delay before the next cycle attempt.
    BackingOff,
    /// The last cycle hit its deadline and was cancelled.
    Cancelled,
}

/// Resilient poller for brokerage account snapshots.
///
/// Cheap to clone; clones share the credential, rate gate and state.
#[derive(Clone)]
pub struct Poller {
    pub(crate) inner: Arc<PollerInner>,
}

pub(crate) struct PollerInner {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) token_store: Arc<dyn TokenStore>,
    pub(crate) gate: Arc<RateGate>,
    pub(crate) cfg: PollerConfig,
    pub(crate) login_url: Url,
    // Held while committing a new credential; never across a network request.
    pub(crate) credential: tokio::sync::Mutex<Credential>,
    // Bumped under the credential lock on every replacement.
    pub(crate) credential_version: AtomicU64,
    // Version last handed to the token store. Held across the store write only.
    pub(crate) persisted_version: tokio::sync::Mutex<u64>,
    state: Mutex<PollState>,
    pub(crate) markets: Mutex<Option<MarketCache>>,
    pub(crate) abandoned_observed: AtomicU64,
}

impl PollerInner {
    fn lock_state(&self) -> MutexGuard<'_, PollState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> PollState {
        *self.lock_state()
    }

    /// Move to `next` unless `scope` has been cancelled. Abandoned cycles never touch
    /// shared state.
    pub(crate) fn transition(&self, scope: &CancellationToken, next: PollState) {
        if scope.is_cancelled() {
            return;
        }
        self.force_transition(next);
    }

    pub(crate) fn force_transition(&self, next: PollState) {
        let mut state = self.lock_state();
        if *state != next {
            #[cfg(feature = "tracing")]
            {
                let from = *state;
                tracing::debug!(?from, to = ?next, "poller state change");
            }
            *state = next;
        }
    }

    pub(crate) fn record_abandoned(&self) {
        self.abandoned_observed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Builder for constructing a [`Poller`].
pub struct PollerBuilder {
    transport: Option<Arc<dyn Transport>>,
    token_store: Option<Arc<dyn TokenStore>>,
    gate: Option<Arc<RateGate>>,
    cfg: PollerConfig,
}

impl Default for PollerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PollerBuilder {
    /// Create a builder with the default configuration and no collaborators.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transport: None,
            token_store: None,
            gate: None,
            cfg: PollerConfig::default(),
        }
    }

    /// Transport every request goes through. It is wrapped in the rate gate.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Store the credential is loaded from and persisted to.
    #[must_use]
    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.token_store = Some(store);
        self
    }

    /// Share an existing rate gate instead of creating one from the configuration.
    #[must_use]
    pub fn rate_gate(mut self, gate: Arc<RateGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, cfg: PollerConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Retry policy between failed cycles.
    #[must_use]
    pub const fn backoff(mut self, cfg: BackoffConfig) -> Self {
        self.cfg.backoff = cfg;
        self
    }

    /// Local request budget. Ignored when a gate is supplied via [`rate_gate`](Self::rate_gate).
    #[must_use]
    pub const fn rate_limit(mut self, cfg: RateLimitConfig) -> Self {
        self.cfg.rate_limit = cfg;
        self
    }

    /// Hard deadline for one cycle.
    #[must_use]
    pub const fn cycle_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.cycle_timeout = timeout;
        self
    }

    /// Pause between ticks of [`Poller::run`].
    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.cfg.poll_interval = interval;
        self
    }

    /// How far back the activity request reaches.
    #[must_use]
    pub const fn activity_lookback(mut self, lookback: Duration) -> Self {
        self.cfg.activity_lookback = lookback;
        self
    }

    /// OAuth token endpoint.
    #[must_use]
    pub fn login_url(mut self, url: impl Into<String>) -> Self {
        self.cfg.login_url = url.into();
        self
    }

    /// Gate polling on the trading hours of `market` (e.g. "TSX").
    #[must_use]
    pub fn market(mut self, market: impl Into<String>) -> Self {
        self.cfg.market = Some(market.into());
        self
    }

    /// Load the persisted credential and build the poller.
    ///
    /// # Errors
    /// Returns `InvalidArg` when the transport or token store is missing or the login
    /// URL does not parse, and `CredentialUnavailable` when the store holds nothing.
    pub async fn build(self) -> Result<Poller, PollError> {
        let transport = self.transport.ok_or_else(|| {
            PollError::InvalidArg("no transport configured; call transport(...)".into())
        })?;
        let token_store = self.token_store.ok_or_else(|| {
            PollError::InvalidArg("no token store configured; call token_store(...)".into())
        })?;
        let login_url = Url::parse(&self.cfg.login_url)
            .map_err(|e| PollError::InvalidArg(format!("login url: {e}")))?;
        if self.cfg.cycle_timeout.is_zero() {
            return Err(PollError::InvalidArg("cycle timeout must be positive".into()));
        }

        let credential = token_store.get_credential().await?;
        let initial = if credential.is_authenticated() {
            PollState::Authenticated
        } else {
            PollState::NeedsLogin
        };
        #[cfg(feature = "tracing")]
        tracing::info!(
            store = %token_store.describe(),
            transport = transport.name(),
            state = ?initial,
            "loaded credential"
        );

        let gate = self
            .gate
            .unwrap_or_else(|| Arc::new(RateGate::new(self.cfg.rate_limit)));
        let gated: Arc<dyn Transport> =
            Arc::new(RateGatedTransport::new(transport, Arc::clone(&gate)));

        Ok(Poller {
            inner: Arc::new(PollerInner {
                transport: gated,
                token_store,
                gate,
                cfg: self.cfg,
                login_url,
                credential: tokio::sync::Mutex::new(credential),
                credential_version: AtomicU64::new(0),
                persisted_version: tokio::sync::Mutex::new(0),
                state: Mutex::new(initial),
                markets: Mutex::new(None),
                abandoned_observed: AtomicU64::new(0),
            }),
        })
    }
}

impl Poller {
    /// Start building a new `Poller`.
    #[must_use]
    pub fn builder() -> PollerBuilder {
        PollerBuilder::new()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PollState {
        self.inner.state()
    }

    /// Effective configuration.
    #[must_use]
    pub fn config(&self) -> &PollerConfig {
        &self.inner.cfg
    }

    /// The rate gate shared by every outbound request.
    #[must_use]
    pub fn rate_gate(&self) -> &Arc<RateGate> {
        &self.inner.gate
    }

    /// Copy of the in-memory credential.
    pub async fn credential(&self) -> Credential {
        self.inner.credential.lock().await.clone()
    }

    /// Number of timed-out cycles whose late result has been observed and logged.
    #[must_use]
    pub fn abandoned_cycles_observed(&self) -> u64 {
        self.inner.abandoned_observed.load(Ordering::Relaxed)
    }
}
