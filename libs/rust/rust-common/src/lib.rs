//! Shared library for cross-cutting concerns in the kids-portal Rust services.
//!
//! This crate provides centralized implementations for:
//! - HTTP client configuration and building
//! - Tracing subscriber setup

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod http;
pub mod tracing_config;

pub use http::{build_http_client, HttpConfig};
pub use tracing_config::{init_tracing, TracingConfig};
