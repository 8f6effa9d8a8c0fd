//! Domain primitives with validated constructors.

use dernek_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a backend resource identifier.
pub const MAX_RESOURCE_ID_CHARS: usize = 36;

/// Validation failures for domain primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    /// `CollectionId` is empty after trimming.
    EmptyCollectionId,
    /// `CollectionId` violates the allowed pattern.
    InvalidCollectionId {
        /// Trimmed identifier that failed validation.
        input: String,
    },
    /// `DocumentId` is empty after trimming.
    EmptyDocumentId,
    /// `BucketId` is empty after trimming.
    EmptyBucketId,
}

impl PrimitiveError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyCollectionId | Self::InvalidCollectionId { .. } => {
                ErrorCode::new("domain", "invalid_collection_id")
            },
            Self::EmptyDocumentId => ErrorCode::new("domain", "invalid_document_id"),
            Self::EmptyBucketId => ErrorCode::new("domain", "invalid_bucket_id"),
        }
    }
}

impl fmt::Display for PrimitiveError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCollectionId => formatter.write_str("CollectionId must be non-empty"),
            Self::InvalidCollectionId { .. } => formatter.write_str(
                "CollectionId must start with a letter or digit and contain at most 36 of [a-zA-Z0-9._-]",
            ),
            Self::EmptyDocumentId => formatter.write_str("DocumentId must be non-empty"),
            Self::EmptyBucketId => formatter.write_str("BucketId must be non-empty"),
        }
    }
}

impl std::error::Error for PrimitiveError {}

impl From<PrimitiveError> for ErrorEnvelope {
    fn from(error: PrimitiveError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());
        match error {
            PrimitiveError::InvalidCollectionId { input } => envelope.with_metadata("input", input),
            PrimitiveError::EmptyCollectionId
            | PrimitiveError::EmptyDocumentId
            | PrimitiveError::EmptyBucketId => envelope,
        }
    }
}

/// Identifier of a backend collection (`users`, `beneficiaries`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionId(Box<str>);

impl CollectionId {
    /// Parse a collection id that satisfies the backend id rules.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let Some(trimmed) = trimmed_non_empty(input.as_ref()) else {
            return Err(PrimitiveError::EmptyCollectionId);
        };

        if !is_valid_resource_id(trimmed) {
            return Err(PrimitiveError::InvalidCollectionId {
                input: trimmed.to_owned(),
            });
        }

        Ok(Self(trimmed.into()))
    }

    /// Build a `CollectionId` from one of the catalog's literal names.
    #[must_use]
    pub fn from_static(name: &'static str) -> Self {
        Self(name.into())
    }

    /// Access the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CollectionId {
    type Error = PrimitiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CollectionId> for String {
    fn from(value: CollectionId) -> Self {
        value.0.into()
    }
}

impl AsRef<str> for CollectionId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Identifier of a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Box<str>);

impl DocumentId {
    /// Parse a `DocumentId` from user input.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        trimmed_non_empty(input.as_ref())
            .map(|trimmed| Self(trimmed.into()))
            .ok_or(PrimitiveError::EmptyDocumentId)
    }

    /// Access the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Identifier of a storage bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketId(Box<str>);

impl BucketId {
    /// Parse a `BucketId` from user input.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        trimmed_non_empty(input.as_ref())
            .map(|trimmed| Self(trimmed.into()))
            .ok_or(PrimitiveError::EmptyBucketId)
    }

    /// Build a `BucketId` from a known non-empty literal.
    #[must_use]
    pub fn from_static(name: &'static str) -> Self {
        Self(name.into())
    }

    /// Access the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

fn trimmed_non_empty(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn is_valid_resource_id(input: &str) -> bool {
    let mut chars = input.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_alphanumeric()
        && input.chars().count() <= MAX_RESOURCE_ID_CHARS
        && chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'))
}
