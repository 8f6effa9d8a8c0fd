//! Document storage boundary contract.

use crate::BoxFuture;
use dernek_domain::{CollectionId, DocumentId};
use dernek_shared::{RequestContext, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Prefix of backend-managed document fields (`$id`, `$createdAt`, ...).
pub const SYSTEM_FIELD_PREFIX: char = '$';
/// Document id field.
pub const FIELD_ID: &str = "$id";
/// Creation time field.
pub const FIELD_CREATED_AT: &str = "$createdAt";
/// Last update time field.
pub const FIELD_UPDATED_AT: &str = "$updatedAt";

/// Document payload for create and update calls.
pub type DocumentData = Map<String, Value>;

/// Stored document: user fields plus `$`-prefixed system fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Wrap a JSON object.
    #[must_use]
    pub const fn from_fields(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Document id, when present.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.0.get(FIELD_ID).and_then(Value::as_str)
    }

    /// Field value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// All fields, system fields included.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Mutable access to all fields.
    pub const fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    /// User fields only.
    pub fn user_fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0
            .iter()
            .filter(|(key, _)| !key.starts_with(SYSTEM_FIELD_PREFIX))
    }

    /// Unwrap into the JSON object.
    #[must_use]
    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

/// Ordering clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Field to order by.
    pub field: Box<str>,
    /// Direction.
    pub direction: SortDirection,
}

/// Full-text search clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchClause {
    /// Field searched.
    pub field: Box<str>,
    /// Search term.
    pub term: Box<str>,
}

/// Equality filter.
#[derive(Debug, Clone, PartialEq)]
pub struct EqualFilter {
    /// Field compared.
    pub field: Box<str>,
    /// Expected value.
    pub value: Value,
}

/// List query for one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentQuery {
    /// Page size.
    pub limit: u32,
    /// Documents to skip.
    pub offset: u32,
    /// Optional search.
    pub search: Option<SearchClause>,
    /// Optional ordering.
    pub order: Option<OrderBy>,
    /// Equality filters, all of which must match.
    pub filters: Vec<EqualFilter>,
}

impl Default for DocumentQuery {
    fn default() -> Self {
        Self {
            limit: 25,
            offset: 0,
            search: None,
            order: None,
            filters: Vec::new(),
        }
    }
}

/// One page of documents plus the total match count.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentPage {
    /// Documents on this page.
    pub documents: Vec<Document>,
    /// Matches across all pages.
    pub total: u64,
}

/// Boundary contract for document CRUD.
pub trait DocumentsPort: Send + Sync {
    /// List documents matching a query.
    fn list_documents(
        &self,
        ctx: &RequestContext,
        collection: CollectionId,
        query: DocumentQuery,
    ) -> BoxFuture<'_, Result<DocumentPage>>;

    /// Fetch one document. Unknown ids fail with `core:not_found`.
    fn get_document(
        &self,
        ctx: &RequestContext,
        collection: CollectionId,
        id: DocumentId,
    ) -> BoxFuture<'_, Result<Document>>;

    /// Create a document with a generated id.
    fn create_document(
        &self,
        ctx: &RequestContext,
        collection: CollectionId,
        data: DocumentData,
    ) -> BoxFuture<'_, Result<Document>>;

    /// Merge `data` into an existing document.
    fn update_document(
        &self,
        ctx: &RequestContext,
        collection: CollectionId,
        id: DocumentId,
        data: DocumentData,
    ) -> BoxFuture<'_, Result<Document>>;

    /// Delete a document.
    fn delete_document(
        &self,
        ctx: &RequestContext,
        collection: CollectionId,
        id: DocumentId,
    ) -> BoxFuture<'_, Result<()>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_fields_skip_system_fields() -> std::result::Result<(), serde_json::Error> {
        let document: Document = serde_json::from_value(json!({
            "$id": "doc_1",
            "$createdAt": "2024-01-01T00:00:00.000Z",
            "name": "Ayşe",
            "status": "active"
        }))?;

        assert_eq!(document.id(), Some("doc_1"));
        let keys: Vec<&str> = document.user_fields().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, vec!["name", "status"]);
        Ok(())
    }
}
