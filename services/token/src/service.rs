//! Token service façade.
//!
//! Serves access tokens per `(module, session)` from the cache while fresh,
//! otherwise builds an assertion, exchanges it and stores the result.
//! Concurrent misses on the same key share one exchange.

use crate::clock::{Clock, SystemClock};
use crate::config::{AuthMode, Config};
use crate::error::TokenError;
use crate::jwt::AssertionBuilder;
use crate::keys::KeyMaterialStore;
use crate::metrics::{self, RequestOutcome};
use crate::module::ModuleIdentity;
use crate::oauth::{ExchangeClient, HttpExchangeClient};
use crate::status::{self, mask_secret, ModuleStatus};
use crate::storage::{CacheKey, CachedToken, TokenCache};
use futures::future::{BoxFuture, FutureExt, Shared};
use secrecy::ExposeSecret;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Longest accepted session label, in characters.
pub const MAX_SESSION_LABEL_CHARS: usize = 100;

type InflightFuture = Shared<BoxFuture<'static, Result<CachedToken, TokenError>>>;

/// Issuance settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub mode: AuthMode,
    pub audience: String,
    pub assertion_ttl_seconds: i64,
    pub token_duration_seconds: i64,
    pub refresh_skew_ms: i64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Config::default().service_settings()
    }
}

/// Where an issued token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenSource {
    /// Fresh cache entry
    Cache,
    /// New JWT-bearer exchange (possibly shared with concurrent callers)
    Exchange,
    /// Configured personal access token
    PersonalAccessToken,
}

/// An access token handed to a caller.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    /// Whole seconds of validity left; `None` for personal access tokens
    pub expires_in: Option<i64>,
    pub source: TokenSource,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("access_token", &mask_secret(&self.access_token))
            .field("expires_in", &self.expires_in)
            .field("source", &self.source)
            .finish()
    }
}

/// Receives every failure before it is returned to the caller.
pub trait FailureObserver: Send + Sync {
    fn on_failure(&self, module: ModuleIdentity, error: &TokenError);
}

struct Inner {
    settings: ServiceSettings,
    store: Arc<dyn KeyMaterialStore>,
    builder: AssertionBuilder,
    exchange: Arc<dyn ExchangeClient>,
    cache: TokenCache,
    clock: Arc<dyn Clock>,
    inflight: Mutex<HashMap<CacheKey, InflightFuture>>,
}

impl Inner {
    async fn issue(&self, key: &CacheKey) -> Result<CachedToken, TokenError> {
        let material = self.store.key_material(key.module)?;
        let session = (!key.session.is_empty()).then_some(key.session.as_str());

        let obtained_at_ms = self.clock.now_millis();
        let assertion =
            self.builder
                .build(&material, session, Some(self.settings.assertion_ttl_seconds))?;
        let token = self
            .exchange
            .exchange(&assertion, self.settings.token_duration_seconds)
            .await?;

        let cached = CachedToken {
            access_token: token.access_token,
            expires_in_seconds: token.expires_in_seconds,
            obtained_at_ms,
        };
        self.cache.put(key.clone(), cached.clone());

        info!(
            key = %key,
            kid = %material.key_id,
            expires_in = cached.expires_in_seconds,
            "Access token issued"
        );
        Ok(cached)
    }
}

/// Hands out access tokens per module.
#[derive(Clone)]
pub struct TokenService {
    inner: Arc<Inner>,
    observer: Option<Arc<dyn FailureObserver>>,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("settings", &self.inner.settings)
            .field("cache", &self.inner.cache)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    #[must_use]
    pub fn new(
        settings: ServiceSettings,
        store: Arc<dyn KeyMaterialStore>,
        exchange: Arc<dyn ExchangeClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let builder = AssertionBuilder::new(&settings.audience, Arc::clone(&clock))
            .with_default_validity(settings.assertion_ttl_seconds);
        let cache = TokenCache::new(Arc::clone(&clock), settings.refresh_skew_ms);

        Self {
            inner: Arc::new(Inner {
                settings,
                store,
                builder,
                exchange,
                cache,
                clock,
                inflight: Mutex::new(HashMap::new()),
            }),
            observer: None,
        }
    }

    /// Wire a service against the real token endpoint and system clock.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Configuration`] if the HTTP client cannot be built.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn KeyMaterialStore>,
    ) -> Result<Self, TokenError> {
        let exchange = HttpExchangeClient::new(&config.api_base_url, &config.http_config())?;
        Ok(Self::new(
            config.service_settings(),
            store,
            Arc::new(exchange),
            Arc::new(SystemClock),
        ))
    }

    /// Report failures to `observer` as well as to the log.
    #[must_use]
    pub fn with_failure_observer(mut self, observer: Arc<dyn FailureObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    #[must_use]
    pub fn settings(&self) -> &ServiceSettings {
        &self.inner.settings
    }

    #[must_use]
    pub fn store(&self) -> &dyn KeyMaterialStore {
        self.inner.store.as_ref()
    }

    /// Current cache entry for a key, fresh or not.
    #[must_use]
    pub fn cached(&self, module: ModuleIdentity, session: Option<&str>) -> Option<CachedToken> {
        self.inner.cache.get(&CacheKey::new(module, session))
    }

    /// Access token for `module`, see [`TokenService::get_grant`].
    ///
    /// # Errors
    ///
    /// Propagates every [`TokenError`] from [`TokenService::get_grant`].
    pub async fn get_token(
        &self,
        module: ModuleIdentity,
        session: Option<&str>,
    ) -> Result<String, TokenError> {
        self.get_grant(module, session)
            .await
            .map(|grant| grant.access_token)
    }

    /// Access token for `module` with its remaining lifetime.
    ///
    /// Makes at most one exchange attempt; failures are never cached and
    /// never retried.
    ///
    /// # Errors
    ///
    /// - [`TokenError::InvalidSessionLabel`] for a malformed label
    /// - [`TokenError::Configuration`] when the module is not configured
    /// - [`TokenError::KeyImport`], [`TokenError::KeyNotRegistered`],
    ///   [`TokenError::SignatureVerification`], [`TokenError::Exchange`]
    ///   from the build and exchange steps
    #[instrument(skip(self))]
    pub async fn get_grant(
        &self,
        module: ModuleIdentity,
        session: Option<&str>,
    ) -> Result<IssuedToken, TokenError> {
        let result = self.grant(module, session).await;
        match &result {
            Ok((grant, outcome)) => {
                metrics::record_request(module, *outcome);
                debug!(source = ?grant.source, expires_in = ?grant.expires_in, "Token served");
            }
            Err(e) => {
                metrics::record_request(module, RequestOutcome::Error);
                warn!(error = %e, kind = e.kind(), operator_action = e.is_operator_action(), "Token request failed");
                if let Some(observer) = &self.observer {
                    observer.on_failure(module, e);
                }
            }
        }
        result.map(|(grant, _)| grant)
    }

    async fn grant(
        &self,
        module: ModuleIdentity,
        session: Option<&str>,
    ) -> Result<(IssuedToken, RequestOutcome), TokenError> {
        if let Some(label) = session {
            validate_session_label(label)?;
        }

        if self.inner.settings.mode == AuthMode::Pat {
            let token = self.inner.store.personal_access_token(module).ok_or_else(|| {
                TokenError::config(format!("No personal access token configured for module {module}"))
            })?;
            validate_personal_access_token(module, token.expose_secret())?;
            return Ok((
                IssuedToken {
                    access_token: token.expose_secret().to_string(),
                    expires_in: None,
                    source: TokenSource::PersonalAccessToken,
                },
                RequestOutcome::Issued,
            ));
        }

        let key = CacheKey::new(module, session);
        if let Some(hit) = self.fresh_grant(&key) {
            return Ok((hit, RequestOutcome::CacheHit));
        }

        let (flight, outcome) = {
            let mut inflight = self.inner.inflight.lock().await;

            // Another flight may have completed while we waited for the lock.
            if let Some(hit) = self.fresh_grant(&key) {
                return Ok((hit, RequestOutcome::CacheHit));
            }

            if let Some(existing) = inflight.get(&key) {
                debug!(key = %key, "Joining in-flight exchange");
                (existing.clone(), RequestOutcome::Joined)
            } else {
                let inner = Arc::clone(&self.inner);
                let flight_key = key.clone();
                let fut: BoxFuture<'static, Result<CachedToken, TokenError>> =
                    Box::pin(async move {
                        let result = inner.issue(&flight_key).await;
                        inner.inflight.lock().await.remove(&flight_key);
                        result
                    });
                let shared = fut.shared();
                inflight.insert(key.clone(), shared.clone());
                (shared, RequestOutcome::Issued)
            }
        };

        let cached = flight.await?;
        Ok((
            IssuedToken {
                access_token: cached.access_token,
                expires_in: Some(cached.expires_in_seconds),
                source: TokenSource::Exchange,
            },
            outcome,
        ))
    }

    fn fresh_grant(&self, key: &CacheKey) -> Option<IssuedToken> {
        let entry = self.inner.cache.get_fresh(key)?;
        Some(IssuedToken {
            expires_in: Some(entry.remaining_seconds(self.inner.clock.now_millis())),
            access_token: entry.access_token,
            source: TokenSource::Cache,
        })
    }

    /// Configuration health of one module.
    #[must_use]
    pub fn check_module(&self, module: ModuleIdentity) -> ModuleStatus {
        status::check_module(self.inner.settings.mode, self.inner.store.as_ref(), module)
    }

    /// Configuration health of every module.
    #[must_use]
    pub fn all_module_status(&self) -> Vec<ModuleStatus> {
        ModuleIdentity::ALL
            .into_iter()
            .map(|module| self.check_module(module))
            .collect()
    }
}

/// Labels are 1 to 100 characters of ASCII letters, digits, `_`, `-` or
/// CJK unified ideographs (U+4E00 to U+9FA5).
///
/// # Errors
///
/// Returns [`TokenError::InvalidSessionLabel`] otherwise.
pub fn validate_session_label(label: &str) -> Result<(), TokenError> {
    let count = label.chars().count();
    if count == 0 || count > MAX_SESSION_LABEL_CHARS {
        return Err(TokenError::InvalidSessionLabel(format!(
            "length must be 1-{MAX_SESSION_LABEL_CHARS} characters, got {count}"
        )));
    }
    if let Some(bad) = label.chars().find(|c| !is_label_char(*c)) {
        return Err(TokenError::InvalidSessionLabel(format!(
            "character {bad:?} is not allowed"
        )));
    }
    Ok(())
}

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

/// Reject personal access tokens that are too short or still the template
/// placeholder.
///
/// # Errors
///
/// Returns [`TokenError::Configuration`] naming the module.
pub fn validate_personal_access_token(module: ModuleIdentity, token: &str) -> Result<(), TokenError> {
    if token.len() < 10 {
        return Err(TokenError::config(format!(
            "Personal access token for module {module} is too short"
        )));
    }
    if token.contains("YOUR_") {
        return Err(TokenError::config(format!(
            "Personal access token for module {module} is still a placeholder"
        )));
    }
    Ok(())
}
