use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pollqt_core::{Credential, PollError, TokenStore};

/// Token store backed by a JSON file with snake_case `access_token`, `refresh_token`
/// and `api_server` keys.
///
/// Bootstrap by writing `{"refresh_token": "..."}` to the path.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store at `path`. Nothing is read until [`get_credential`](TokenStore::get_credential).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the token file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }

    async fn get_credential(&self) -> Result<Credential, PollError> {
        #[cfg(feature = "tracing")]
        tracing::info!(path = %self.path.display(), "reading token");
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PollError::CredentialUnavailable(format!(
                    "token file {} not found",
                    self.path.display()
                )));
            }
            Err(e) => {
                return Err(PollError::CredentialUnavailable(format!(
                    "cannot read {}: {e}",
                    self.path.display()
                )));
            }
        };
        serde_json::from_str(&content).map_err(|e| {
            PollError::CredentialUnavailable(format!("malformed {}: {e}", self.path.display()))
        })
    }

    async fn put_credential(&self, credential: &Credential) -> Result<(), PollError> {
        #[cfg(feature = "tracing")]
        tracing::info!(path = %self.path.display(), "writing token");
        let io_err = |e: std::io::Error| PollError::TokenStore(format!("{}: {e}", self.path.display()));

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(credential)
            .map_err(|e| PollError::TokenStore(e.to_string()))?;

        // Readers never observe a partially written file.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)
    }
}
