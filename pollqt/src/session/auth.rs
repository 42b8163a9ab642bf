use std::sync::atomic::Ordering;

use pollqt_core::{Credential, HttpResponse, PollError};
use tokio_util::sync::CancellationToken;

use crate::core::{PollState, PollerInner};
use crate::session::request::rate_limit_reset;

const LOGIN: &str = "login";

/// Access token and API server for the next request.
pub(crate) struct Session {
    pub(crate) access_token: String,
    pub(crate) api_server: String,
}

impl PollerInner {
    /// Return the current session, logging in first when the credential lacks one.
    pub(crate) async fn ensure_session(
        &self,
        scope: &CancellationToken,
    ) -> Result<Session, PollError> {
        let refresh_token = {
            let cred = self.credential.lock().await;
            if let (Some(access_token), Some(api_server)) = (&cred.access_token, &cred.api_server)
            {
                return Ok(Session {
                    access_token: access_token.clone(),
                    api_server: api_server.clone(),
                });
            }
            cred.refresh_token.clone().ok_or_else(|| {
                PollError::CredentialUnavailable("credential has no refresh token".into())
            })?
        };
        self.transition(scope, PollState::NeedsLogin);
        let fresh = self.login(scope, &refresh_token).await?;
        let session = Session {
            access_token: fresh.access_token.clone().unwrap_or_default(),
            api_server: fresh.api_server.clone().unwrap_or_default(),
        };
        self.commit_credential(scope, fresh).await?;
        self.transition(scope, PollState::Authenticated);
        Ok(session)
    }

    /// Refresh-token exchange. Rate-limit answers with a reset time are retried in place.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "pollqt::login", skip_all, fields(endpoint = LOGIN))
    )]
    async fn login(
        &self,
        scope: &CancellationToken,
        refresh_token: &str,
    ) -> Result<Credential, PollError> {
        let mut url = self.login_url.clone();
        url.query_pairs_mut()
            .append_pair("grant_type", "refresh_token")
            .append_pair("refresh_token", refresh_token);

        loop {
            if scope.is_cancelled() {
                return Err(PollError::Cancelled);
            }
            #[cfg(feature = "tracing")]
            let started = tokio::time::Instant::now();
            let resp: HttpResponse = self.transport.get(&url, &[]).await?;
            #[cfg(feature = "tracing")]
            tracing::info!(
                status = resp.status,
                elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "login response"
            );

            match resp.status {
                s if (200..300).contains(&s) => {
                    let mut fresh: Credential = serde_json::from_str(&resp.body)?;
                    // Keep the refresh token if none was returned.
                    if fresh.refresh_token.is_none() {
                        fresh.refresh_token = Some(refresh_token.to_string());
                    }
                    if !fresh.is_authenticated() {
                        return Err(PollError::Data(
                            "login response lacks access_token or api_server".into(),
                        ));
                    }
                    return Ok(fresh);
                }
                400 | 401 => return Err(PollError::unauthorized(LOGIN)),
                429 => {
                    let reset =
                        rate_limit_reset(&resp).ok_or_else(|| PollError::rate_limited(LOGIN))?;
                    self.gate.request_delay_until(reset);
                }
                s => return Err(PollError::unexpected_status(LOGIN, s)),
            }
        }
    }

    /// Replace the in-memory credential and persist it.
    ///
    /// The scope is checked under the credential lock, so a cycle cancelled before this
    /// point cannot overwrite what a newer cycle installed. The store write happens
    /// after the lock is released.
    async fn commit_credential(
        &self,
        scope: &CancellationToken,
        next: Credential,
    ) -> Result<(), PollError> {
        let (version, snapshot) = {
            let mut cred = self.credential.lock().await;
            if scope.is_cancelled() {
                #[cfg(feature = "tracing")]
                tracing::warn!("cycle cancelled; discarding credential update");
                return Err(PollError::Cancelled);
            }
            *cred = next;
            (self.next_version(), cred.clone())
        };
        self.persist(version, &snapshot).await;
        Ok(())
    }

    /// Drop the access token after a 401, keeping the refresh token.
    pub(crate) async fn invalidate(&self, scope: &CancellationToken) -> Result<(), PollError> {
        let (version, snapshot) = {
            let mut cred = self.credential.lock().await;
            if scope.is_cancelled() {
                return Err(PollError::Cancelled);
            }
            *cred = cred.invalidated();
            (self.next_version(), cred.clone())
        };
        self.transition(scope, PollState::NeedsLogin);
        self.persist(version, &snapshot).await;
        Ok(())
    }

    fn next_version(&self) -> u64 {
        self.credential_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Best-effort store write. Writes are serialized and a version older than the last
    /// one written is skipped, so the store never goes back to a replaced credential.
    async fn persist(&self, version: u64, cred: &Credential) {
        let mut last = self.persisted_version.lock().await;
        if *last >= version {
            #[cfg(feature = "tracing")]
            tracing::debug!(version, "newer credential already persisted; skipping");
            return;
        }
        *last = version;
        match self.token_store.put_credential(cred).await {
            Ok(()) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(store = %self.token_store.describe(), "credential persisted");
            }
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    store = %self.token_store.describe(),
                    error = %e,
                    "failed to persist credential; continuing with in-memory copy"
                );
                #[cfg(not(feature = "tracing"))]
                let _ = e;
            }
        }
    }
}
