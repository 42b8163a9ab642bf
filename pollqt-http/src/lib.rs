//! pollqt-http
//!
//! Production [`Transport`] backed by `reqwest`. Performs exactly one GET per call;
//! every HTTP status is handed back to the poller untouched.
#![warn(missing_docs)]

use std::time::Duration;

use async_trait::async_trait;
use pollqt_core::{HttpResponse, PollError, Transport};
use url::Url;

/// Default per-request timeout applied by [`ReqwestTransport::new`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `reqwest`-backed transport.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build with a fresh client using [`DEFAULT_REQUEST_TIMEOUT`].
    ///
    /// # Errors
    /// Returns `PollError::Transport` if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, PollError> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Build with a fresh client and the given per-request timeout.
    ///
    /// # Errors
    /// Returns `PollError::Transport` if the TLS backend cannot be initialized.
    pub fn with_timeout(timeout: Duration) -> Result<Self, PollError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pollqt/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PollError::transport("client", e.to_string()))?;
        Ok(Self { client })
    }

    /// Build from an existing `reqwest::Client`.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Map a reqwest failure without its URL; query strings may carry credentials.
fn transport_error(url: &Url, e: reqwest::Error) -> PollError {
    PollError::transport(url.path(), e.without_url().to_string())
}

#[async_trait]
impl Transport for ReqwestTransport {
    fn name(&self) -> &'static str {
        "reqwest"
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "pollqt_http::get", skip(self, headers), fields(path = %url.path()))
    )]
    async fn get(
        &self,
        url: &Url,
        headers: &[(String, String)],
    ) -> Result<HttpResponse, PollError> {
        let mut req = self.client.get(url.clone());
        for (name, value) in headers {
            req = req.header(name.as_str(), value.as_str());
        }

        let resp = req
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = resp
            .text()
            .await
            .map_err(|e| transport_error(url, e))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(status, bytes = body.len(), "response received");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
