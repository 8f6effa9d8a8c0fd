//! Collection schema model consumed by the provisioning routine.

use crate::primitives::CollectionId;
use dernek_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Declared attribute type.
///
/// Closed on purpose: every dispatch site matches exhaustively, so adding a
/// variant breaks the build until each site handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    /// Free text with a maximum size.
    String,
    /// Signed 64-bit integer.
    Integer,
    /// Floating point number.
    Float,
    /// Boolean flag.
    Boolean,
    /// ISO-8601 timestamp.
    Datetime,
    /// One of a fixed set of string options.
    Enum,
    /// List of strings, stored as serialized JSON text.
    Array,
}

impl AttributeType {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Datetime => "datetime",
            Self::Enum => "enum",
            Self::Array => "array",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Numeric bounds for integer and float attributes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AttributeValidation {
    /// Inclusive lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// One declared attribute of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDefinition {
    /// Attribute key.
    pub key: Box<str>,
    /// Declared type.
    #[serde(rename = "type")]
    pub kind: AttributeType,
    /// Whether a value must be supplied on create.
    pub required: bool,
    /// Maximum length for string attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    /// Default value used when the attribute is optional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Allowed values for enum attributes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_options: Vec<Box<str>>,
    /// Numeric bounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<AttributeValidation>,
}

/// Index flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Unique constraint.
    Unique,
    /// Plain lookup index.
    Key,
    /// Full-text search index.
    Fulltext,
}

impl IndexKind {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::Key => "key",
            Self::Fulltext => "fulltext",
        }
    }
}

/// One declared index of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Index key.
    pub key: Box<str>,
    /// Index flavour.
    #[serde(rename = "type")]
    pub kind: IndexKind,
    /// Indexed attribute keys, in order.
    pub attributes: Vec<Box<str>>,
}

/// Permission scope granted on a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionScope {
    /// List and read documents.
    Read,
    /// Create documents.
    Create,
    /// Update documents.
    Update,
    /// Delete documents.
    Delete,
}

impl PermissionScope {
    /// Backend permission verb.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Permission flags declared for a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CollectionPermissions {
    /// Documents are readable.
    pub read: bool,
    /// Documents can be created.
    pub write: bool,
    /// Documents can be updated.
    pub update: bool,
    /// Documents can be deleted.
    pub delete: bool,
}

impl CollectionPermissions {
    /// Granted scopes in a stable order.
    #[must_use]
    pub fn scopes(self) -> Vec<PermissionScope> {
        [
            (self.read, PermissionScope::Read),
            (self.write, PermissionScope::Create),
            (self.update, PermissionScope::Update),
            (self.delete, PermissionScope::Delete),
        ]
        .into_iter()
        .filter_map(|(granted, scope)| granted.then_some(scope))
        .collect()
    }
}

/// Static definition of one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDefinition {
    /// Collection id.
    pub id: CollectionId,
    /// Display name.
    pub name: Box<str>,
    /// Free-form description.
    pub description: Box<str>,
    /// Declared permissions.
    pub permissions: CollectionPermissions,
    /// Attributes in creation order.
    pub attributes: Vec<AttributeDefinition>,
    /// Indexes in creation order.
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,
}

impl CollectionDefinition {
    /// Look up an attribute by key.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&AttributeDefinition> {
        self.attributes
            .iter()
            .find(|attribute| attribute.key.as_ref() == key)
    }

    /// Check internal consistency: unique keys, enum options, index targets.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut keys = BTreeSet::new();
        for attribute in &self.attributes {
            if !keys.insert(attribute.key.as_ref()) {
                return Err(SchemaError::DuplicateAttribute {
                    collection: self.id.to_string(),
                    key: attribute.key.to_string(),
                });
            }
            if attribute.kind == AttributeType::Enum && attribute.enum_options.is_empty() {
                return Err(SchemaError::EnumWithoutOptions {
                    collection: self.id.to_string(),
                    key: attribute.key.to_string(),
                });
            }
        }

        let mut index_keys = BTreeSet::new();
        for index in &self.indexes {
            if !index_keys.insert(index.key.as_ref()) {
                return Err(SchemaError::DuplicateIndex {
                    collection: self.id.to_string(),
                    index: index.key.to_string(),
                });
            }
            if index.attributes.is_empty() {
                return Err(SchemaError::EmptyIndex {
                    collection: self.id.to_string(),
                    index: index.key.to_string(),
                });
            }
            if let Some(missing) = index
                .attributes
                .iter()
                .find(|attribute| !keys.contains(attribute.as_ref()))
            {
                return Err(SchemaError::UnknownIndexAttribute {
                    collection: self.id.to_string(),
                    index: index.key.to_string(),
                    attribute: missing.to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Inconsistencies in a collection definition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// Two attributes share a key.
    #[error("duplicate attribute \"{key}\" in \"{collection}\"")]
    DuplicateAttribute {
        /// Collection id.
        collection: String,
        /// Attribute key.
        key: String,
    },
    /// Enum attribute declares no options.
    #[error("enum attribute \"{key}\" in \"{collection}\" has no options")]
    EnumWithoutOptions {
        /// Collection id.
        collection: String,
        /// Attribute key.
        key: String,
    },
    /// Two indexes share a key.
    #[error("duplicate index \"{index}\" in \"{collection}\"")]
    DuplicateIndex {
        /// Collection id.
        collection: String,
        /// Index key.
        index: String,
    },
    /// Index lists no attributes.
    #[error("index \"{index}\" in \"{collection}\" lists no attributes")]
    EmptyIndex {
        /// Collection id.
        collection: String,
        /// Index key.
        index: String,
    },
    /// Index references an undeclared attribute.
    #[error("index \"{index}\" in \"{collection}\" references unknown attribute \"{attribute}\"")]
    UnknownIndexAttribute {
        /// Collection id.
        collection: String,
        /// Index key.
        index: String,
        /// Missing attribute key.
        attribute: String,
    },
}

impl SchemaError {
    /// Collection the error belongs to.
    #[must_use]
    pub fn collection(&self) -> &str {
        match self {
            Self::DuplicateAttribute { collection, .. }
            | Self::EnumWithoutOptions { collection, .. }
            | Self::DuplicateIndex { collection, .. }
            | Self::EmptyIndex { collection, .. }
            | Self::UnknownIndexAttribute { collection, .. } => collection,
        }
    }
}

impl From<SchemaError> for ErrorEnvelope {
    fn from(error: SchemaError) -> Self {
        let collection = error.collection().to_owned();
        Self::invariant(ErrorCode::new("domain", "invalid_schema"), error.to_string())
            .with_metadata("collection", collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn definition(value: Value) -> Result<CollectionDefinition, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[test]
    fn attribute_definition_parses_camel_case_fields() -> Result<(), serde_json::Error> {
        let attribute: AttributeDefinition = serde_json::from_value(json!({
            "key": "role",
            "type": "enum",
            "required": true,
            "enumOptions": ["admin", "user"]
        }))?;

        assert_eq!(attribute.kind, AttributeType::Enum);
        assert_eq!(attribute.enum_options.len(), 2);
        assert!(attribute.size.is_none());
        Ok(())
    }

    #[test]
    fn unknown_attribute_type_is_rejected() {
        let parsed: Result<AttributeDefinition, _> = serde_json::from_value(json!({
            "key": "geo",
            "type": "point",
            "required": false
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn validate_flags_index_on_missing_attribute() -> Result<(), serde_json::Error> {
        let collection = definition(json!({
            "id": "tasks",
            "name": "tasks",
            "description": "",
            "permissions": {"read": true, "write": false, "update": false, "delete": false},
            "attributes": [{"key": "title", "type": "string", "required": true}],
            "indexes": [{"key": "status_idx", "type": "key", "attributes": ["status"]}]
        }))?;

        assert_eq!(
            collection.validate(),
            Err(SchemaError::UnknownIndexAttribute {
                collection: "tasks".to_owned(),
                index: "status_idx".to_owned(),
                attribute: "status".to_owned(),
            })
        );
        Ok(())
    }

    #[test]
    fn validate_flags_enum_without_options() -> Result<(), serde_json::Error> {
        let collection = definition(json!({
            "id": "tasks",
            "name": "tasks",
            "description": "",
            "permissions": {"read": true, "write": true, "update": true, "delete": true},
            "attributes": [{"key": "status", "type": "enum", "required": true}]
        }))?;

        assert!(matches!(
            collection.validate(),
            Err(SchemaError::EnumWithoutOptions { .. })
        ));
        Ok(())
    }

    #[test]
    fn permission_scopes_follow_flags() {
        let permissions = CollectionPermissions {
            read: true,
            write: false,
            update: true,
            delete: false,
        };
        assert_eq!(
            permissions.scopes(),
            vec![PermissionScope::Read, PermissionScope::Update]
        );
    }
}
