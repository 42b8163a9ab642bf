//! Test doubles for the pollqt collaborators: a scripted transport, an in-memory token
//! store and a recording sink, plus canned upstream payloads.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use pollqt_core::{Credential, OutputSink, PollError, Snapshot, TokenStore};

mod dynamic;
pub mod fixtures;

pub use dynamic::{MockBehavior, RecordedRequest, ScriptedTransport, TransportController};

/// Token store that keeps the credential in memory and records every write.
#[derive(Default)]
pub struct MemoryTokenStore {
    current: Mutex<Option<Credential>>,
    writes: Mutex<Vec<Credential>>,
    fail_writes: Mutex<bool>,
    hang_writes: Mutex<bool>,
}

impl MemoryTokenStore {
    /// Empty store; `get_credential` fails with `CredentialUnavailable`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with `credential`.
    #[must_use]
    pub fn with_credential(credential: Credential) -> Self {
        let me = Self::default();
        *me.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(credential);
        me
    }

    /// Make every following `put_credential` fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap_or_else(PoisonError::into_inner) = fail;
    }

    /// Make every following `put_credential` record the write and then never complete.
    pub fn set_hang_writes(&self, hang: bool) {
        *self.hang_writes.lock().unwrap_or_else(PoisonError::into_inner) = hang;
    }

    /// Currently persisted credential.
    #[must_use]
    pub fn current(&self) -> Option<Credential> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Every credential passed to `put_credential`, failed writes included.
    #[must_use]
    pub fn writes(&self) -> Vec<Credential> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn get_credential(&self) -> Result<Credential, PollError> {
        self.current()
            .ok_or_else(|| PollError::CredentialUnavailable("memory store is empty".into()))
    }

    async fn put_credential(&self, credential: &Credential) -> Result<(), PollError> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner).push(credential.clone());
        let hang = *self.hang_writes.lock().unwrap_or_else(PoisonError::into_inner);
        if hang {
            std::future::pending::<()>().await;
        }
        if *self.fail_writes.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(PollError::TokenStore("forced write failure".into()));
        }
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(credential.clone());
        Ok(())
    }
}

/// Sink that keeps every batch it receives.
pub struct RecordingSink {
    name: &'static str,
    batches: Mutex<Vec<Vec<Snapshot>>>,
    fail: Mutex<bool>,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new("recording")
    }
}

impl RecordingSink {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            batches: Mutex::new(Vec::new()),
            fail: Mutex::new(false),
        }
    }

    /// Make every following `on_event` fail after recording the batch.
    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock().unwrap_or_else(PoisonError::into_inner) = fail;
    }

    /// Batches received so far, oldest first.
    #[must_use]
    pub fn batches(&self) -> Vec<Vec<Snapshot>> {
        self.batches.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// All snapshots received so far, flattened.
    #[must_use]
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.batches().into_iter().flatten().collect()
    }
}

#[async_trait]
impl OutputSink for RecordingSink {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn on_event(&self, snapshots: &[Snapshot]) -> Result<(), PollError> {
        self.batches.lock().unwrap_or_else(PoisonError::into_inner).push(snapshots.to_vec());
        if *self.fail.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(PollError::sink(self.name, "forced failure"));
        }
        Ok(())
    }
}

/// Credential as issued by [`fixtures::login::body`] with access token `access`.
#[must_use]
pub fn authenticated_credential(access: &str, refresh: &str) -> Credential {
    Credential {
        access_token: Some(access.to_string()),
        refresh_token: Some(refresh.to_string()),
        api_server: Some(fixtures::API_SERVER.to_string()),
    }
}

/// Script a healthy upstream: login, the given accounts, and identical account data on
/// every request.
pub async fn script_healthy_upstream(controller: &TransportController, numbers: &[&str]) {
    use fixtures::{accounts, login};

    controller
        .respond(fixtures::LOGIN_PATH, login::body("access-1", "refresh-2"))
        .await;
    controller
        .respond(fixtures::ACCOUNTS_PATH, accounts::list(numbers))
        .await;
    for n in numbers {
        controller
            .respond(&fixtures::balances_path(n), accounts::balances(1_000.5))
            .await;
        controller
            .respond(
                &fixtures::positions_path(n),
                accounts::positions(&[("THI.TO", 100)]),
            )
            .await;
        controller
            .respond(&fixtures::activities_path(n), accounts::activities())
            .await;
    }
}
