use serde::{Deserialize, Serialize};

/// OAuth credential used to reach the brokerage API.
///
/// The persisted form uses snake_case keys (`access_token`, `refresh_token`,
/// `api_server`), which is also the shape of the login response, so the same type
/// decodes both. Extra keys such as `token_type` and `expires_in` are ignored.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credential {
    /// Bearer token for API requests. Cleared when the upstream answers 401.
    pub access_token: Option<String>,
    /// Single-use token exchanged for a new access token on login.
    pub refresh_token: Option<String>,
    /// Base URL of the API server assigned at login, e.g. `https://api01.iq.questrade.com/`.
    pub api_server: Option<String>,
}

impl Credential {
    /// Credential carrying only a refresh token, as written by an operator to bootstrap.
    pub fn bootstrap(refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: None,
            refresh_token: Some(refresh_token.into()),
            api_server: None,
        }
    }

    /// True when both the access token and the API server are known.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.api_server.is_some()
    }

    /// Copy that keeps the refresh token and drops everything else.
    #[must_use]
    pub fn invalidated(&self) -> Self {
        Self {
            access_token: None,
            refresh_token: self.refresh_token.clone(),
            api_server: None,
        }
    }
}

// Tokens never reach the logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("api_server", &self.api_server)
            .finish()
    }
}
