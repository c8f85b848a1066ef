//! In-memory access token cache.
//!
//! Entries are replaced whole on every successful exchange and never
//! persisted.

use crate::clock::Clock;
use crate::module::ModuleIdentity;
use crate::status::mask_secret;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Default refresh skew in milliseconds.
pub const DEFAULT_REFRESH_SKEW_MS: i64 = 60_000;

/// Cache key: module plus session label (empty when absent).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub module: ModuleIdentity,
    pub session: String,
}

impl CacheKey {
    #[must_use]
    pub fn new(module: ModuleIdentity, session: Option<&str>) -> Self {
        Self {
            module,
            session: session.unwrap_or_default().to_string(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.session.is_empty() {
            write!(f, "{}", self.module)
        } else {
            write!(f, "{}/{}", self.module, self.session)
        }
    }
}

/// Most recently obtained access token for one key.
#[derive(Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_in_seconds: i64,
    pub obtained_at_ms: i64,
}

impl CachedToken {
    /// Epoch milliseconds at which the server considers the token expired.
    #[must_use]
    pub const fn expires_at_ms(&self) -> i64 {
        self.obtained_at_ms
            .saturating_add(self.expires_in_seconds.saturating_mul(1000))
    }

    /// Whole seconds left before expiry, rounded down.
    #[must_use]
    pub const fn remaining_seconds(&self, now_ms: i64) -> i64 {
        self.expires_at_ms().saturating_sub(now_ms).div_euclid(1000)
    }
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("access_token", &mask_secret(&self.access_token))
            .field("expires_in_seconds", &self.expires_in_seconds)
            .field("obtained_at_ms", &self.obtained_at_ms)
            .finish()
    }
}

/// An entry may be reused only while `obtained_at + expires_in * 1000 > now + skew`.
///
/// Exactly at the boundary the entry is stale.
#[must_use]
pub const fn is_fresh(entry: &CachedToken, now_ms: i64, skew_ms: i64) -> bool {
    entry.expires_at_ms() > now_ms.saturating_add(skew_ms)
}

/// Token cache owned by the token service.
pub struct TokenCache {
    entries: RwLock<HashMap<CacheKey, CachedToken>>,
    clock: Arc<dyn Clock>,
    skew_ms: i64,
}

impl TokenCache {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, skew_ms: i64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            skew_ms,
        }
    }

    /// Entry for `key`, fresh or not.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<CachedToken> {
        self.entries.read().get(key).cloned()
    }

    /// Replace the entry for `key`.
    pub fn put(&self, key: CacheKey, token: CachedToken) {
        self.entries.write().insert(key, token);
    }

    /// Entry for `key` only if it is fresh now.
    #[must_use]
    pub fn get_fresh(&self, key: &CacheKey) -> Option<CachedToken> {
        let now = self.clock.now_millis();
        self.get(key).filter(|entry| is_fresh(entry, now, self.skew_ms))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCache")
            .field("entries", &self.len())
            .field("skew_ms", &self.skew_ms)
            .finish_non_exhaustive()
    }
}
