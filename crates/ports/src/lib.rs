//! # dernek-ports
//!
//! Port traits between the application layer and its infrastructure:
//! schema administration, document and file storage, probes, and logging.
//! This crate depends only on `domain` and `shared`.

use std::future::Future;
use std::pin::Pin;

/// Boxed future used by port traits.
///
/// Every port is I/O bound, so the allocation per call is irrelevant next to
/// the network round trip.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod documents;
pub mod logger;
pub mod probe;
pub mod schema;
pub mod storage;

pub use documents::*;
pub use logger::*;
pub use probe::*;
pub use schema::*;
pub use storage::*;

// Re-export the domain types used in port signatures, so adapter crates can
// implement ports without naming `dernek-domain` directly.
pub use dernek_domain::{BucketId, CollectionId, DocumentId, IndexKind, PermissionScope};
