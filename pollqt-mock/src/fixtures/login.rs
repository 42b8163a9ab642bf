use serde_json::json;

use super::API_SERVER;

/// Login response handing out `access` and a rotated `refresh` token on [`API_SERVER`].
#[must_use]
pub fn body(access: &str, refresh: &str) -> String {
    json!({
        "access_token": access,
        "token_type": "Bearer",
        "expires_in": 1800,
        "refresh_token": refresh,
        "api_server": API_SERVER,
    })
    .to_string()
}
