//! # dernek-domain
//!
//! Domain model for the dashboard's backend configuration tooling.
//!
//! - **Primitives** - `CollectionId`, `DocumentId`, `BucketId`
//! - **Schema** - attribute, index, and permission definitions per collection
//! - **Catalog** - the embedded table of collections provisioned by migrations
//! - **Backend** - `ProviderMode`, `ExecutionContext`, `SdkKind`
//!
//! ## Dependency Rules
//!
//! - Depends only on `shared` crate
//! - No infrastructure or adapter dependencies
//! - Pure domain logic with no I/O

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub use dernek_shared::shared_crate_version;

pub mod backend;
pub mod catalog;
pub mod primitives;
pub mod schema;

pub use backend::{ExecutionContext, ProviderMode, SdkKind};
pub use catalog::{CatalogError, collection_catalog, collections, parse_catalog, rollback_order};
pub use primitives::{BucketId, CollectionId, DocumentId, MAX_RESOURCE_ID_CHARS, PrimitiveError};
pub use schema::{
    AttributeDefinition, AttributeType, AttributeValidation, CollectionDefinition,
    CollectionPermissions, IndexDefinition, IndexKind, PermissionScope, SchemaError,
};

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_depends_on_shared() {
        assert!(!domain_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }
}
