//! JWT-bearer token exchange against the authorization server.

use crate::error::TokenError;
use crate::jwt::{AssertionClaims, JwtAssertion, JwtSerializer};
use crate::metrics;
use crate::oauth::classify::classify_failure;
use crate::oauth::models::{
    ErrorBody, ExchangedToken, TokenRequest, TokenResponse, MAX_EXPIRES_IN_SECONDS,
    TOKEN_ENDPOINT_PATH,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_common::{build_http_client, HttpConfig};
use std::time::Instant;
use tracing::{debug, error, instrument, warn};

/// Exchanges a signed assertion for an access token.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Perform one exchange. No retries.
    ///
    /// # Errors
    ///
    /// - [`TokenError::KeyNotRegistered`] when the server does not know the `kid`
    /// - [`TokenError::SignatureVerification`] when it cannot verify the assertion
    /// - [`TokenError::Exchange`] for any other failure, including timeouts
    async fn exchange(
        &self,
        assertion: &JwtAssertion,
        duration_seconds: i64,
    ) -> Result<ExchangedToken, TokenError>;
}

/// [`ExchangeClient`] over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpExchangeClient {
    http: Client,
    token_url: String,
}

impl HttpExchangeClient {
    /// Create a client for the API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Configuration`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, http_config: &HttpConfig) -> Result<Self, TokenError> {
        let http = build_http_client(http_config)
            .map_err(|e| TokenError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(http, base_url))
    }

    /// Use an existing reqwest client.
    #[must_use]
    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            token_url: format!("{}{TOKEN_ENDPOINT_PATH}", base_url.trim_end_matches('/')),
        }
    }

    /// Full token endpoint URL.
    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    async fn send(
        &self,
        assertion: &JwtAssertion,
        duration_seconds: i64,
    ) -> Result<ExchangedToken, TokenError> {
        let response = self
            .http
            .post(&self.token_url)
            .bearer_auth(assertion.as_str())
            .json(&TokenRequest::jwt_bearer(duration_seconds))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body = ErrorBody::parse(&text);
            let message = body.message().map_or_else(
                || status.canonical_reason().unwrap_or("unknown error").to_string(),
                str::to_string,
            );

            if status == StatusCode::UNAUTHORIZED {
                log_unauthorized(assertion, &message);
            }
            return Err(classify_failure(
                assertion.module,
                &assertion.key_id,
                status.as_u16(),
                &message,
            ));
        }

        let parsed: TokenResponse = response.json().await.map_err(|e| {
            TokenError::exchange(Some(status.as_u16()), format!("Malformed token response: {e}"))
        })?;

        if parsed.access_token.is_empty() || parsed.expires_in <= 0 {
            return Err(TokenError::exchange(
                Some(status.as_u16()),
                "Token response is missing access_token or a positive expires_in",
            ));
        }
        if parsed.expires_in > MAX_EXPIRES_IN_SECONDS {
            return Err(TokenError::exchange(
                Some(status.as_u16()),
                format!("Token response expires_in {} is out of range", parsed.expires_in),
            ));
        }

        Ok(parsed.into())
    }
}

#[async_trait]
impl ExchangeClient for HttpExchangeClient {
    #[instrument(skip(self, assertion), fields(module = %assertion.module, kid = %assertion.key_id))]
    async fn exchange(
        &self,
        assertion: &JwtAssertion,
        duration_seconds: i64,
    ) -> Result<ExchangedToken, TokenError> {
        let start = Instant::now();
        let result = self.send(assertion, duration_seconds).await;
        metrics::record_exchange_latency(assertion.module, start.elapsed().as_secs_f64());

        match &result {
            Ok(token) => debug!(expires_in = token.expires_in_seconds, "Token exchange succeeded"),
            Err(e) => {
                metrics::record_exchange_failure(assertion.module, e);
                warn!(error = %e, kind = e.kind(), "Token exchange failed");
            }
        }
        result
    }
}

fn transport_error(err: reqwest::Error) -> TokenError {
    if err.is_timeout() {
        TokenError::exchange(None, "Request to token endpoint timed out")
    } else {
        TokenError::exchange(None, format!("Request to token endpoint failed: {err}"))
    }
}

/// Log what was presented so the operator can compare it with the
/// registration on the authorization server.
fn log_unauthorized(assertion: &JwtAssertion, message: &str) {
    let header = jsonwebtoken::decode_header(assertion.as_str()).ok();
    let claims = JwtSerializer::deserialize_unverified::<serde_json::Value, AssertionClaims>(
        assertion.as_str(),
    )
    .ok()
    .map(|(_, claims)| claims);

    error!(
        module = %assertion.module,
        app_id = %assertion.issuer,
        kid = %assertion.key_id,
        audience = claims.as_ref().map_or("", |c| c.aud.as_str()),
        header_alg = ?header.as_ref().map(|h| h.alg),
        header_kid = ?header.as_ref().and_then(|h| h.kid.clone()),
        iat = claims.as_ref().map(|c| c.iat),
        exp = claims.as_ref().map(|c| c.exp),
        server_message = message,
        "Authorization server rejected assertion"
    );
}
