//! JWT-bearer assertion builder.

use crate::clock::Clock;
use crate::error::TokenError;
use crate::jwt::claims::{AssertionClaims, AssertionHeader};
use crate::jwt::nonce::NonceGenerator;
use crate::jwt::serializer::JwtSerializer;
use crate::jwt::signer::RsaSigner;
use crate::keys::KeyMaterial;
use crate::module::ModuleIdentity;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Default assertion lifetime in seconds.
pub const DEFAULT_ASSERTION_TTL_SECONDS: i64 = 600;

/// A signed assertion, used for exactly one exchange.
#[derive(Clone)]
pub struct JwtAssertion {
    token: String,
    pub module: ModuleIdentity,
    pub key_id: String,
    pub issuer: String,
    pub jti: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl JwtAssertion {
    /// The compact serialized token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for JwtAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtAssertion")
            .field("module", &self.module)
            .field("key_id", &self.key_id)
            .field("issuer", &self.issuer)
            .field("jti", &self.jti)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Builds RS256 assertions for a fixed audience.
pub struct AssertionBuilder {
    audience: String,
    clock: Arc<dyn Clock>,
    default_validity_seconds: i64,
}

impl AssertionBuilder {
    #[must_use]
    pub fn new(audience: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            audience: audience.into(),
            clock,
            default_validity_seconds: DEFAULT_ASSERTION_TTL_SECONDS,
        }
    }

    #[must_use]
    pub const fn with_default_validity(mut self, seconds: i64) -> Self {
        self.default_validity_seconds = seconds;
        self
    }

    /// Build and sign an assertion for `material`.
    ///
    /// `validity_seconds` falls back to the builder default.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Configuration`] for a non-positive validity
    /// - [`TokenError::KeyImport`] if the private key cannot be imported
    /// - [`TokenError::Encoding`] on serialization or signing failure
    pub fn build(
        &self,
        material: &KeyMaterial,
        session_label: Option<&str>,
        validity_seconds: Option<i64>,
    ) -> Result<JwtAssertion, TokenError> {
        let validity = validity_seconds.unwrap_or(self.default_validity_seconds);
        if validity <= 0 {
            return Err(TokenError::config(format!(
                "Assertion validity must be positive, got {validity}"
            )));
        }

        let signer = RsaSigner::import_pkcs8_pem(material)?;
        let jti = NonceGenerator::generate();
        let issued_at = self.clock.now_seconds();

        let header = AssertionHeader::rs256(&material.key_id);
        let claims = AssertionClaims::new(
            &material.issuer_app_id,
            &self.audience,
            issued_at,
            validity,
            &jti,
        )
        .with_session_name(session_label.map(str::to_string));

        let token = JwtSerializer::serialize(&header, &claims, &signer)?;

        debug!(
            module = %material.module,
            kid = %material.key_id,
            iat = claims.iat,
            exp = claims.exp,
            "Built JWT assertion"
        );

        Ok(JwtAssertion {
            token,
            module: material.module,
            key_id: material.key_id.clone(),
            issuer: material.issuer_app_id.clone(),
            jti,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }
}
