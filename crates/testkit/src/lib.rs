//! # dernek-testkit
//!
//! Test helpers, in-memory adapters, and environment fixtures.
//! This crate depends on `ports`, `domain`, and `shared`.

pub mod env;
pub mod errors;
pub mod in_memory;

/// Returns the testkit crate version.
#[must_use]
pub const fn testkit_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
