//! Assertion header and claim set.

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};

/// Media type declared in every assertion header.
pub const ASSERTION_TYPE: &str = "JWT";

/// JOSE header of a JWT-bearer assertion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssertionHeader {
    pub alg: Algorithm,
    pub typ: String,
    pub kid: String,
}

impl AssertionHeader {
    /// RS256 header naming the given key id.
    #[must_use]
    pub fn rs256(key_id: impl Into<String>) -> Self {
        Self {
            alg: Algorithm::RS256,
            typ: ASSERTION_TYPE.to_string(),
            kid: key_id.into(),
        }
    }
}

/// Claims presented to the authorization server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssertionClaims {
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub session_name: Option<String>,
}

impl AssertionClaims {
    /// Claims valid for `validity_seconds` starting at `issued_at`.
    #[must_use]
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        issued_at: i64,
        validity_seconds: i64,
        jti: impl Into<String>,
    ) -> Self {
        Self {
            iss: issuer.into(),
            aud: audience.into(),
            iat: issued_at,
            exp: issued_at + validity_seconds,
            jti: jti.into(),
            session_name: None,
        }
    }

    #[must_use]
    pub fn with_session_name(mut self, session_name: Option<String>) -> Self {
        self.session_name = session_name;
        self
    }

    /// Seconds between issue and expiry.
    #[must_use]
    pub const fn validity_seconds(&self) -> i64 {
        self.exp - self.iat
    }
}
