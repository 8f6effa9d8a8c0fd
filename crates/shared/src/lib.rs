//! # dernek-shared
//!
//! Shared utilities, result types, and error handling for the dernek workspace.
//!
//! This crate provides foundational types that are used across all other crates:
//!
//! - The structured error envelope and the workspace `Result` alias
//! - Request context with correlation ids and cooperative cancellation
//! - Retry with exponential backoff and timeouts that honor cancellation
//! - Secret detection and redaction
//!
//! ## Design Principles
//!
//! 1. **No workspace dependencies** - This crate only depends on external crates
//! 2. **Serde-compatible** - Error types serialize into reports and JSON logs

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod context;
pub mod errors;
pub mod redaction;
pub mod result;
pub mod retry;
pub mod timeout;

pub use context::{CancellationToken, CorrelationId, RequestContext};
pub use errors::{
    ErrorClass, ErrorCode, ErrorEnvelope, ErrorKind, ErrorMetadata, HTTP_STATUS_METADATA_KEY,
};
pub use redaction::{REDACTED, SecretString, is_secret_key, redact_if_secret};
pub use result::{Result, ResultExt};
pub use retry::{RetryPolicy, retry_async, retry_async_with_observer};
pub use timeout::timeout_with_context;

/// Returns the shared crate version.
#[must_use]
pub const fn shared_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
