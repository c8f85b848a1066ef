//! Coze token service library.
//!
//! Builds RS256 JWT-bearer assertions from per-module key material,
//! exchanges them for short-lived access tokens and caches the result per
//! module and session.

#![forbid(unsafe_code)]

pub mod clock;
pub mod config;
pub mod error;
pub mod jwt;
pub mod keys;
pub mod metrics;
pub mod module;
pub mod oauth;
pub mod service;
pub mod status;
pub mod storage;

// Re-exports for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AuthMode, Config};
pub use error::{KeyImportReason, TokenError};
pub use jwt::{AssertionBuilder, JwtAssertion};
pub use keys::{KeyMaterial, KeyMaterialStore, StaticKeyStore};
pub use module::ModuleIdentity;
pub use oauth::{ApiProbe, ExchangeClient, ExchangedToken, HttpExchangeClient};
pub use service::{FailureObserver, IssuedToken, ServiceSettings, TokenService, TokenSource};
pub use status::{mask_secret, ConfigSummary, ModuleStatus};
pub use storage::{CacheKey, CachedToken, TokenCache};
