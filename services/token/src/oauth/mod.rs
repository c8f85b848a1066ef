//! OAuth JWT-bearer exchange.

pub mod classify;
pub mod client;
pub mod models;
pub mod probe;

pub use classify::classify_failure;
pub use client::{ExchangeClient, HttpExchangeClient};
pub use models::{
    ExchangedToken, TokenRequest, JWT_BEARER_GRANT, MAX_EXPIRES_IN_SECONDS, TOKEN_ENDPOINT_PATH,
};
pub use probe::{ApiProbe, OnlineInfo};
