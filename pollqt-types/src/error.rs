use thiserror::Error;

/// Unified error type for the pollqt workspace.
///
/// Covers transport failures, upstream status classes (authorization, rate limiting,
/// unexpected statuses), payload decoding problems, cycle-level timeouts and the
/// terminal conditions surfaced to the poll loop.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PollError {
    /// Network-level failure before any HTTP status was received.
    #[error("transport failure on {endpoint}: {msg}")]
    Transport {
        /// Endpoint label (e.g. "balances").
        endpoint: String,
        /// Human-readable error message.
        msg: String,
    },

    /// The upstream rejected the credential twice in a row for the same request,
    /// or rejected the refresh token during login.
    #[error("unauthorized: {endpoint}")]
    Unauthorized {
        /// Endpoint label that was rejected.
        endpoint: String,
    },

    /// The upstream throttled the request and did not say when to come back.
    #[error("rate limited without reset time: {endpoint}")]
    RateLimited {
        /// Endpoint label that was throttled.
        endpoint: String,
    },

    /// Any other non-success HTTP status.
    #[error("unexpected status {status} from {endpoint}")]
    UnexpectedStatus {
        /// Endpoint label.
        endpoint: String,
        /// HTTP status code.
        status: u16,
    },

    /// Issues with the returned payload (undecodable JSON, missing fields, etc.).
    #[error("data issue: {0}")]
    Data(String),

    /// A whole poll cycle exceeded its deadline and was cancelled.
    #[error("poll cycle timed out after {timeout_ms}ms")]
    CycleTimeout {
        /// Configured cycle timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The cycle observed its cancellation signal and stopped early.
    #[error("poll cycle cancelled")]
    Cancelled,

    /// The backoff budget is spent; the tick is abandoned.
    #[error("retries exhausted after {attempts} attempts")]
    RetriesExhausted {
        /// Number of retries that were attempted.
        attempts: u32,
    },

    /// No usable credential is persisted. Requires operator intervention.
    #[error("credential unavailable: {0}")]
    CredentialUnavailable(String),

    /// Persisting the credential failed.
    #[error("token store failure: {0}")]
    TokenStore(String),

    /// An output sink failed to accept a batch.
    #[error("{sink} failed: {msg}")]
    Sink {
        /// Sink name that failed.
        sink: String,
        /// Human-readable error message.
        msg: String,
    },

    /// Invalid input argument or configuration.
    #[error("invalid argument: {0}")]
    InvalidArg(String),
}

impl PollError {
    /// Helper: build a `Transport` error.
    pub fn transport(endpoint: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build an `Unauthorized` error.
    pub fn unauthorized(endpoint: impl Into<String>) -> Self {
        Self::Unauthorized {
            endpoint: endpoint.into(),
        }
    }

    /// Helper: build a `RateLimited` error.
    pub fn rate_limited(endpoint: impl Into<String>) -> Self {
        Self::RateLimited {
            endpoint: endpoint.into(),
        }
    }

    /// Helper: build an `UnexpectedStatus` error.
    pub fn unexpected_status(endpoint: impl Into<String>, status: u16) -> Self {
        Self::UnexpectedStatus {
            endpoint: endpoint.into(),
            status,
        }
    }

    /// Helper: build a `Sink` error with the sink name and message.
    pub fn sink(sink: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Sink {
            sink: sink.into(),
            msg: msg.into(),
        }
    }

    /// Returns true if a fresh poll cycle may succeed where this one failed.
    ///
    /// `CredentialUnavailable`, `RetriesExhausted` and `InvalidArg` are terminal for
    /// the current tick; everything else is handed to the backoff policy.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::CredentialUnavailable(_) | Self::RetriesExhausted { .. } | Self::InvalidArg(_)
        )
    }

    /// Returns true for network-level failures and 5xx statuses.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::CycleTimeout { .. } => true,
            Self::UnexpectedStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for PollError {
    fn from(e: serde_json::Error) -> Self {
        Self::Data(e.to_string())
    }
}
