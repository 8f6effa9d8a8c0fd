//! # dernek-adapters
//!
//! Adapter implementations for ports (Appwrite REST, in-memory mock, health
//! HTTP probe, loggers). This crate depends on `ports`, `domain`, and `shared`.

#[cfg(feature = "appwrite")]
pub mod appwrite;
#[cfg(feature = "health-http")]
pub mod health_http;
pub mod log_sink;
pub mod logger;
pub mod mock;
pub mod tracing_logger;

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
