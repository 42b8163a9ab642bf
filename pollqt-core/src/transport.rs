use std::collections::HashMap;

use async_trait::async_trait;
use pollqt_types::PollError;
use url::Url;

/// Status, headers and body of one HTTP exchange.
///
/// Header names are stored lower-cased so lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers keyed by lower-cased name.
    pub headers: HashMap<String, String>,
    /// Response body as text.
    pub body: String,
}

impl HttpResponse {
    /// Build a response with the given status and body and no headers.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Shorthand for a `200 OK` response.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    /// Attach a header, lower-casing the name.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// True for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Minimal GET-with-headers primitive the poller issues every request through.
///
/// Implementations perform exactly one exchange per call and never retry; all retry,
/// rate limiting and re-authentication policy lives in the poller. Any HTTP status is a
/// successful exchange from the transport's point of view. Only failures to obtain a
/// response at all (DNS, connect, TLS, body read) are reported as `PollError::Transport`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Human-readable transport name for logging.
    fn name(&self) -> &'static str;

    /// Issue a GET request to `url` with the given headers.
    async fn get(
        &self,
        url: &Url,
        headers: &[(String, String)],
    ) -> Result<HttpResponse, PollError>;
}
