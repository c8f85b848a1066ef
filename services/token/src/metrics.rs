//! Prometheus metrics for token issuance.

use crate::error::TokenError;
use crate::module::ModuleIdentity;
use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};

/// How a token request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Served from a fresh cache entry
    CacheHit,
    /// A new exchange was performed by this caller
    Issued,
    /// Awaited an exchange started by another caller
    Joined,
    /// Failed
    Error,
}

impl RequestOutcome {
    /// Metric label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CacheHit => "cache_hit",
            Self::Issued => "issued",
            Self::Joined => "joined",
            Self::Error => "error",
        }
    }
}

/// Token requests counter.
pub static TOKEN_REQUESTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "coze_token_requests_total",
        "Total number of access token requests",
        &["module", "outcome"]
    )
    .expect("Failed to register token_requests metric")
});

/// Exchange failures counter.
pub static EXCHANGE_FAILURES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "coze_token_exchange_failures_total",
        "Total number of failed token exchanges",
        &["module", "kind"]
    )
    .expect("Failed to register exchange_failures metric")
});

/// Token endpoint latency histogram.
pub static EXCHANGE_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "coze_token_exchange_latency_seconds",
        "Token endpoint round-trip latency in seconds",
        &["module"],
        vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("Failed to register exchange_latency metric")
});

/// Record how a token request ended.
pub fn record_request(module: ModuleIdentity, outcome: RequestOutcome) {
    TOKEN_REQUESTS
        .with_label_values(&[module.as_str(), outcome.as_str()])
        .inc();
}

/// Record a failed exchange.
pub fn record_exchange_failure(module: ModuleIdentity, error: &TokenError) {
    EXCHANGE_FAILURES
        .with_label_values(&[module.as_str(), error.kind()])
        .inc();
}

/// Record token endpoint latency.
pub fn record_exchange_latency(module: ModuleIdentity, duration_secs: f64) {
    EXCHANGE_LATENCY
        .with_label_values(&[module.as_str()])
        .observe(duration_secs);
}
