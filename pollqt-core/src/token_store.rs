use async_trait::async_trait;
use pollqt_types::{Credential, PollError};

/// Persistent home of the OAuth credential.
///
/// The poller loads the credential once at construction and writes it back after every
/// login and every forced invalidation.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Human-readable store description for logging (e.g. the file path).
    fn describe(&self) -> String;

    /// Load the persisted credential.
    ///
    /// # Errors
    /// Returns `PollError::CredentialUnavailable` when nothing is persisted. This is
    /// terminal: there is no automatic way to mint a first refresh token.
    async fn get_credential(&self) -> Result<Credential, PollError>;

    /// Persist `credential`, replacing whatever was stored.
    ///
    /// # Errors
    /// Returns `PollError::TokenStore` on write failure. Callers log it and carry on
    /// with the in-memory credential.
    async fn put_credential(&self, credential: &Credential) -> Result<(), PollError>;
}
