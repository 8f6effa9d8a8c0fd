//! Schema administration boundary contract (collections, attributes, indexes).

use crate::BoxFuture;
use dernek_domain::{CollectionId, IndexKind, PermissionScope};
use dernek_shared::{RequestContext, Result};

/// Collection as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCollection {
    /// Collection id.
    pub id: CollectionId,
    /// Display name.
    pub name: Box<str>,
}

/// Request to create a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    /// Collection id.
    pub id: CollectionId,
    /// Display name.
    pub name: Box<str>,
    /// Scopes granted to signed-in users.
    pub permissions: Vec<PermissionScope>,
}

/// Typed attribute creation request, one variant per backend attribute kind.
///
/// Defaults are only present for optional attributes.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeRequest {
    /// String attribute.
    String {
        /// Attribute key.
        key: Box<str>,
        /// Maximum length.
        size: u32,
        /// Value required on create.
        required: bool,
        /// Default value.
        default: Option<Box<str>>,
    },
    /// Integer attribute.
    Integer {
        /// Attribute key.
        key: Box<str>,
        /// Value required on create.
        required: bool,
        /// Inclusive lower bound.
        min: Option<i64>,
        /// Inclusive upper bound.
        max: Option<i64>,
        /// Default value.
        default: Option<i64>,
    },
    /// Float attribute.
    Float {
        /// Attribute key.
        key: Box<str>,
        /// Value required on create.
        required: bool,
        /// Inclusive lower bound.
        min: Option<f64>,
        /// Inclusive upper bound.
        max: Option<f64>,
        /// Default value.
        default: Option<f64>,
    },
    /// Boolean attribute.
    Boolean {
        /// Attribute key.
        key: Box<str>,
        /// Value required on create.
        required: bool,
        /// Default value.
        default: Option<bool>,
    },
    /// Datetime attribute.
    Datetime {
        /// Attribute key.
        key: Box<str>,
        /// Value required on create.
        required: bool,
        /// Default value (ISO-8601).
        default: Option<Box<str>>,
    },
    /// Enum attribute.
    Enum {
        /// Attribute key.
        key: Box<str>,
        /// Allowed values.
        elements: Vec<Box<str>>,
        /// Value required on create.
        required: bool,
        /// Default value.
        default: Option<Box<str>>,
    },
}

impl AttributeRequest {
    /// Attribute key.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::String { key, .. }
            | Self::Integer { key, .. }
            | Self::Float { key, .. }
            | Self::Boolean { key, .. }
            | Self::Datetime { key, .. }
            | Self::Enum { key, .. } => key,
        }
    }

    /// Backend kind name used in request paths.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::String { .. } => "string",
            Self::Integer { .. } => "integer",
            Self::Float { .. } => "float",
            Self::Boolean { .. } => "boolean",
            Self::Datetime { .. } => "datetime",
            Self::Enum { .. } => "enum",
        }
    }
}

/// Request to create an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRequest {
    /// Index key.
    pub key: Box<str>,
    /// Index flavour.
    pub kind: IndexKind,
    /// Indexed attribute keys.
    pub attributes: Vec<Box<str>>,
}

/// Boundary contract for provisioning collections in the remote database.
pub trait SchemaAdminPort: Send + Sync {
    /// Fetch a collection. A missing collection fails with `core:not_found`.
    fn get_collection(
        &self,
        ctx: &RequestContext,
        id: CollectionId,
    ) -> BoxFuture<'_, Result<RemoteCollection>>;

    /// Create a collection.
    fn create_collection(
        &self,
        ctx: &RequestContext,
        spec: CollectionSpec,
    ) -> BoxFuture<'_, Result<()>>;

    /// Create one attribute on an existing collection.
    fn create_attribute(
        &self,
        ctx: &RequestContext,
        collection: CollectionId,
        attribute: AttributeRequest,
    ) -> BoxFuture<'_, Result<()>>;

    /// Create one index on an existing collection.
    fn create_index(
        &self,
        ctx: &RequestContext,
        collection: CollectionId,
        index: IndexRequest,
    ) -> BoxFuture<'_, Result<()>>;

    /// Delete a collection and its documents.
    fn delete_collection(
        &self,
        ctx: &RequestContext,
        id: CollectionId,
    ) -> BoxFuture<'_, Result<()>>;
}
