//! Wire types for the token endpoint.

use crate::status::mask_secret;
use serde::{Deserialize, Serialize};
use std::fmt;

/// OAuth 2.0 JWT-bearer grant type.
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Token endpoint path below the API base URL.
pub const TOKEN_ENDPOINT_PATH: &str = "/api/permission/oauth2/token";

/// Longest `expires_in` accepted from the server (one year).
pub const MAX_EXPIRES_IN_SECONDS: i64 = 365 * 24 * 60 * 60;

/// JSON body POSTed to the token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenRequest {
    pub grant_type: String,
    pub duration_seconds: i64,
}

impl TokenRequest {
    #[must_use]
    pub fn jwt_bearer(duration_seconds: i64) -> Self {
        Self {
            grant_type: JWT_BEARER_GRANT.to_string(),
            duration_seconds,
        }
    }
}

/// Successful token endpoint response.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &mask_secret(&self.access_token))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Error body returned by the API on non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
}

impl ErrorBody {
    /// Parse `text`, falling back to an empty body for non-JSON responses.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        serde_json::from_str(text).unwrap_or_default()
    }

    /// Best human-readable message carried by the body.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.error_message
            .as_deref()
            .or(self.msg.as_deref())
            .filter(|m| !m.trim().is_empty())
    }
}

/// An access token as returned by one exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct ExchangedToken {
    pub access_token: String,
    pub expires_in_seconds: i64,
}

impl From<TokenResponse> for ExchangedToken {
    fn from(response: TokenResponse) -> Self {
        Self {
            access_token: response.access_token,
            expires_in_seconds: response.expires_in,
        }
    }
}

impl fmt::Debug for ExchangedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangedToken")
            .field("access_token", &mask_secret(&self.access_token))
            .field("expires_in_seconds", &self.expires_in_seconds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let json = serde_json::to_value(TokenRequest::jwt_bearer(900)).unwrap();
        assert_eq!(json["grant_type"], JWT_BEARER_GRANT);
        assert_eq!(json["duration_seconds"], 900);
    }

    #[test]
    fn test_error_body_fallbacks() {
        assert_eq!(
            ErrorBody::parse(r#"{"error_message":"invalid kid"}"#).message(),
            Some("invalid kid")
        );
        assert_eq!(ErrorBody::parse(r#"{"code":4100,"msg":"bad token"}"#).message(), Some("bad token"));
        assert_eq!(ErrorBody::parse("<html>gateway</html>").message(), None);
        assert_eq!(ErrorBody::parse(r#"{"error_message":"  "}"#).message(), None);
    }

    #[test]
    fn test_debug_masks_access_token() {
        let token = ExchangedToken {
            access_token: "czs_abcdefghijklmnopqrstuvwxyz".to_string(),
            expires_in_seconds: 900,
        };
        assert!(!format!("{token:?}").contains("abcdefghijklmnop"));
    }
}
