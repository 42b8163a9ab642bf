use std::sync::Arc;

use async_trait::async_trait;
use pollqt_core::{HttpResponse, PollError, Transport};
use url::Url;

use crate::rate_gate::RateGate;

/// Transport wrapper that passes every request through a shared [`RateGate`].
///
/// Several wrappers may share one gate; the budget then covers all of them.
pub struct RateGatedTransport {
    inner: Arc<dyn Transport>,
    gate: Arc<RateGate>,
}

impl RateGatedTransport {
    /// Wrap `inner` so each `get` first waits on `gate`.
    pub fn new(inner: Arc<dyn Transport>, gate: Arc<RateGate>) -> Self {
        Self { inner, gate }
    }

    /// The gate this wrapper admits requests through.
    #[must_use]
    pub fn gate(&self) -> &Arc<RateGate> {
        &self.gate
    }
}

#[async_trait]
impl Transport for RateGatedTransport {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn get(
        &self,
        url: &Url,
        headers: &[(String, String)],
    ) -> Result<HttpResponse, PollError> {
        self.gate.wait_until_runnable().await;
        self.inner.get(url, headers).await
    }
}
