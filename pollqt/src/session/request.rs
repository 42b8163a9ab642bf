use chrono::{DateTime, TimeZone, Utc};
use pollqt_core::{HttpResponse, PollError};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::core::{PollState, PollerInner};

/// Header carrying the unix time (seconds) at which the upstream budget refills.
pub(crate) const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Parse the reset time of a 429 response.
pub(crate) fn rate_limit_reset(resp: &HttpResponse) -> Option<DateTime<Utc>> {
    let secs: i64 = resp.header(RATE_LIMIT_RESET)?.trim().parse().ok()?;
    Utc.timestamp_opt(secs, 0).single()
}

/// Resolve `path` (no leading slash) against the API server.
pub(crate) fn api_url(
    api_server: &str,
    path: &str,
    query: &[(&str, String)],
) -> Result<Url, PollError> {
    let base = if api_server.ends_with('/') {
        Url::parse(api_server)
    } else {
        Url::parse(&format!("{api_server}/"))
    }
    .map_err(|e| PollError::Data(format!("invalid api_server {api_server:?}: {e}")))?;
    let mut url = base
        .join(path)
        .map_err(|e| PollError::InvalidArg(format!("invalid path {path:?}: {e}")))?;
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in query {
            pairs.append_pair(k, v);
        }
    }
    Ok(url)
}

impl PollerInner {
    /// Issue one authenticated GET and return the body of its 2xx answer.
    ///
    /// A 401 invalidates the credential, logs in again and retries this request once.
    /// A 429 with a reset time installs a gate hold and retries in place.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "pollqt::request", skip_all, fields(endpoint = endpoint, path = path))
    )]
    pub(crate) async fn fetch(
        &self,
        scope: &CancellationToken,
        endpoint: &'static str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<String, PollError> {
        let mut reauthenticated = false;
        loop {
            if scope.is_cancelled() {
                return Err(PollError::Cancelled);
            }
            let session = self.ensure_session(scope).await?;
            self.transition(scope, PollState::Polling);

            let url = api_url(&session.api_server, path, query)?;
            let headers = [(
                "Authorization".to_string(),
                format!("Bearer {}", session.access_token),
            )];

            #[cfg(feature = "tracing")]
            let started = tokio::time::Instant::now();
            let resp = match self.transport.get(&url, &headers).await {
                Ok(resp) => resp,
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        error = %e,
                        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                        "request failed"
                    );
                    return Err(e);
                }
            };
            #[cfg(feature = "tracing")]
            tracing::debug!(
                status = resp.status,
                elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "response"
            );

            match resp.status {
                s if (200..300).contains(&s) => return Ok(resp.body),
                401 => {
                    if reauthenticated {
                        #[cfg(feature = "tracing")]
                        tracing::error!(status = 401, "rejected again after re-login");
                        // The next cycle logs in before its first request.
                        self.invalidate(scope).await?;
                        return Err(PollError::unauthorized(endpoint));
                    }
                    reauthenticated = true;
                    #[cfg(feature = "tracing")]
                    tracing::warn!(status = 401, "access token rejected; logging in again");
                    self.invalidate(scope).await?;
                }
                429 => {
                    let Some(reset) = rate_limit_reset(&resp) else {
                        #[cfg(feature = "tracing")]
                        tracing::error!(status = 429, "rate limited without a usable reset time");
                        return Err(PollError::rate_limited(endpoint));
                    };
                    #[cfg(feature = "tracing")]
                    tracing::warn!(status = 429, %reset, "rate limited; holding until reset");
                    self.gate.request_delay_until(reset);
                }
                s => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(status = s, "unexpected status");
                    return Err(PollError::unexpected_status(endpoint, s));
                }
            }
        }
    }

    /// [`fetch`](Self::fetch) and decode the JSON body.
    pub(crate) async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        scope: &CancellationToken,
        endpoint: &'static str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PollError> {
        let body = self.fetch(scope, endpoint, path, query).await?;
        serde_json::from_str(&body)
            .map_err(|e| PollError::Data(format!("{endpoint}: {e}")))
    }
}
