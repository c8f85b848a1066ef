//! Centralized configuration for the token service.
//!
//! All configuration is loaded from environment variables and validated
//! at startup. Key material is loaded separately through
//! [`Config::load_key_store`].

use crate::error::TokenError;
use crate::jwt::DEFAULT_ASSERTION_TTL_SECONDS;
use crate::keys::StaticKeyStore;
use crate::service::ServiceSettings;
use crate::storage::DEFAULT_REFRESH_SKEW_MS;
use rust_common::{HttpConfig, TracingConfig};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.coze.cn";
/// Default assertion audience.
pub const DEFAULT_AUDIENCE: &str = "api.coze.cn";
/// Default requested access-token lifetime in seconds.
pub const DEFAULT_TOKEN_DURATION_SECONDS: i64 = 900;

/// How access tokens are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// JWT-bearer exchange with per-module signing keys
    #[default]
    OAuthJwt,
    /// Per-module personal access tokens, no exchange
    Pat,
}

impl AuthMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OAuthJwt => "oauth_jwt",
            Self::Pat => "pat",
        }
    }
}

impl FromStr for AuthMode {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "oauth_jwt" | "oauth" | "jwt" => Ok(Self::OAuthJwt),
            "pat" => Ok(Self::Pat),
            _ => Err(TokenError::config(format!("Invalid COZE_AUTH_MODE: {s}"))),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API base URL; the token endpoint lives below it
    pub api_base_url: String,
    /// `aud` claim of every assertion
    pub jwt_audience: String,
    /// Authentication mode
    pub auth_mode: AuthMode,
    /// Assertion lifetime in seconds
    pub assertion_ttl_seconds: i64,
    /// Requested access-token lifetime in seconds
    pub token_duration_seconds: i64,
    /// Refresh skew in milliseconds
    pub refresh_skew_ms: i64,
    /// Bound on every outbound request
    pub http_timeout: Duration,
    /// JSON key material file; per-module variables are used when unset
    pub key_file: Option<PathBuf>,
    /// Log level filter
    pub log_level: String,
    /// JSON log output
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            jwt_audience: DEFAULT_AUDIENCE.to_string(),
            auth_mode: AuthMode::OAuthJwt,
            assertion_ttl_seconds: DEFAULT_ASSERTION_TTL_SECONDS,
            token_duration_seconds: DEFAULT_TOKEN_DURATION_SECONDS,
            refresh_skew_ms: DEFAULT_REFRESH_SKEW_MS,
            http_timeout: Duration::from_secs(15),
            key_file: None,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_env() -> Result<Self, TokenError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TokenError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let string = |name: &str, default: String| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };

        let api_base_url = string("COZE_API_BASE_URL", defaults.api_base_url)
            .trim_end_matches('/')
            .to_string();
        if !(api_base_url.starts_with("https://") || api_base_url.starts_with("http://")) {
            return Err(TokenError::config(format!(
                "Invalid COZE_API_BASE_URL: {api_base_url}"
            )));
        }

        let auth_mode = match lookup("COZE_AUTH_MODE") {
            Some(mode) if !mode.trim().is_empty() => mode.parse()?,
            _ => defaults.auth_mode,
        };

        let config = Self {
            api_base_url,
            jwt_audience: string("COZE_JWT_AUDIENCE", defaults.jwt_audience),
            auth_mode,
            assertion_ttl_seconds: parse_var(&lookup, "COZE_ASSERTION_TTL", defaults.assertion_ttl_seconds)?,
            token_duration_seconds: parse_var(&lookup, "COZE_TOKEN_DURATION", defaults.token_duration_seconds)?,
            refresh_skew_ms: parse_var(&lookup, "COZE_REFRESH_SKEW_MS", defaults.refresh_skew_ms)?,
            http_timeout: Duration::from_secs(parse_var(&lookup, "COZE_HTTP_TIMEOUT", 15_u64)?),
            key_file: lookup("COZE_KEY_FILE")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            log_level: string("LOG_LEVEL", defaults.log_level),
            log_json: parse_var(&lookup, "LOG_JSON", defaults.log_json)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), TokenError> {
        if self.assertion_ttl_seconds <= 0 {
            return Err(TokenError::config("COZE_ASSERTION_TTL must be positive"));
        }
        if self.token_duration_seconds <= 0 {
            return Err(TokenError::config("COZE_TOKEN_DURATION must be positive"));
        }
        if self.refresh_skew_ms < 0 {
            return Err(TokenError::config("COZE_REFRESH_SKEW_MS must not be negative"));
        }
        if self.http_timeout.is_zero() {
            return Err(TokenError::config("COZE_HTTP_TIMEOUT must be positive"));
        }
        Ok(())
    }

    /// Load key material from `key_file`, or from per-module variables.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Configuration`] for unreadable or incomplete
    /// material.
    pub fn load_key_store<F>(&self, lookup: F) -> Result<StaticKeyStore, TokenError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match &self.key_file {
            Some(path) => StaticKeyStore::from_json_file(path),
            None => StaticKeyStore::from_lookup(lookup),
        }
    }

    /// Settings for [`crate::TokenService`].
    #[must_use]
    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            mode: self.auth_mode,
            audience: self.jwt_audience.clone(),
            assertion_ttl_seconds: self.assertion_ttl_seconds,
            token_duration_seconds: self.token_duration_seconds,
            refresh_skew_ms: self.refresh_skew_ms,
        }
    }

    /// Outbound HTTP client settings.
    #[must_use]
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig::default()
            .with_timeout(self.http_timeout)
            .with_user_agent(concat!("coze-token-service/", env!("CARGO_PKG_VERSION")))
    }

    /// Tracing subscriber settings.
    #[must_use]
    pub fn tracing_config(&self) -> TracingConfig {
        TracingConfig::default()
            .with_service_name("coze-token-service")
            .with_log_level(&self.log_level)
            .with_json_output(self.log_json)
    }
}

/// Parse a variable with a default value.
fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, TokenError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(name) {
        Some(val) if !val.trim().is_empty() => val
            .trim()
            .parse()
            .map_err(|e| TokenError::config(format!("Invalid {name}: {e}"))),
        _ => Ok(default),
    }
}
