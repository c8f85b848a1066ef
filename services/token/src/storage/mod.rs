//! Token storage.

pub mod cache;

pub use cache::{is_fresh, CacheKey, CachedToken, TokenCache, DEFAULT_REFRESH_SKEW_MS};
