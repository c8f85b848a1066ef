//! Authenticated API probe.

use crate::error::TokenError;
use crate::oauth::models::ErrorBody;
use reqwest::Client;
use rust_common::{build_http_client, HttpConfig};
use serde::Deserialize;
use tracing::{info, instrument};

const ONLINE_INFO_PATH: &str = "/v1/bot/get_online_info";

/// Response of the bot online-info endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OnlineInfo {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Calls a cheap authenticated endpoint to confirm a token works.
#[derive(Debug, Clone)]
pub struct ApiProbe {
    http: Client,
    base_url: String,
}

impl ApiProbe {
    /// # Errors
    ///
    /// Returns [`TokenError::Configuration`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, http_config: &HttpConfig) -> Result<Self, TokenError> {
        let http = build_http_client(http_config)
            .map_err(|e| TokenError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(http, base_url))
    }

    #[must_use]
    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the online info of `bot_id` using `access_token`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Exchange`] with the HTTP status and server
    /// message on non-2xx, or with no status on transport failure.
    #[instrument(skip(self, access_token))]
    pub async fn bot_online_info(
        &self,
        access_token: &str,
        bot_id: &str,
    ) -> Result<OnlineInfo, TokenError> {
        let response = self
            .http
            .get(format!("{}{ONLINE_INFO_PATH}", self.base_url))
            .query(&[("bot_id", bot_id)])
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| TokenError::exchange(None, format!("Probe request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = ErrorBody::parse(&text)
                .message()
                .map_or_else(
                    || status.canonical_reason().unwrap_or("unknown error").to_string(),
                    str::to_string,
                );
            return Err(TokenError::exchange(Some(status.as_u16()), message));
        }

        let info: OnlineInfo = response.json().await.map_err(|e| {
            TokenError::exchange(Some(status.as_u16()), format!("Malformed probe response: {e}"))
        })?;
        info!(code = info.code, "API probe succeeded");
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_probe_sends_bearer_and_bot_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ONLINE_INFO_PATH))
            .and(query_param("bot_id", "7547302685909827623"))
            .and(header("authorization", "Bearer czs_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0, "msg": "", "data": {"version": "1"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let probe = ApiProbe::new(&server.uri(), &HttpConfig::default()).unwrap();
        let info = probe.bot_online_info("czs_token", "7547302685909827623").await.unwrap();
        assert_eq!(info.code, 0);
    }

    #[tokio::test]
    async fn test_probe_failure_carries_status_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(serde_json::json!({"error_message": "no permission"})),
            )
            .mount(&server)
            .await;

        let probe = ApiProbe::new(&server.uri(), &HttpConfig::default()).unwrap();
        let err = probe.bot_online_info("t", "1").await.unwrap_err();
        assert!(matches!(err, TokenError::Exchange { status: Some(403), ref message } if message == "no permission"));
    }

    #[tokio::test]
    async fn test_probe_non_json_failure_uses_reason_phrase() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let probe = ApiProbe::new(&server.uri(), &HttpConfig::default()).unwrap();
        let err = probe.bot_online_info("t", "1").await.unwrap_err();
        assert!(matches!(err, TokenError::Exchange { status: Some(502), ref message } if message == "Bad Gateway"));
    }
}
