//! In-memory mock backend used when no remote backend is configured.
//!
//! Documents are seeded from an embedded JSON table and live for the lifetime
//! of the process. Searching is a case-insensitive substring match on one
//! field, ordering compares JSON scalars with missing values last, and
//! pagination slices the filtered result.

use chrono::{SecondsFormat, Utc};
use dernek_domain::{BucketId, CollectionId, DocumentId};
use dernek_ports::{
    BoxFuture, Document, DocumentData, DocumentPage, DocumentQuery, DocumentsPort, FIELD_CREATED_AT,
    FIELD_ID, FIELD_UPDATED_AT, FileStoragePort, FileUpload, PreviewSize, SYSTEM_FIELD_PREFIX,
    SortDirection, StoredFile,
};
use dernek_shared::{ErrorCode, ErrorEnvelope, RequestContext, Result};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Message reported by operations the mock does not support.
pub const NOT_IMPLEMENTED_IN_MOCK: &str = "Not implemented in mock";

const SEED_JSON: &str = include_str!("seed.json");
const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Default)]
struct MockState {
    collections: BTreeMap<Box<str>, Vec<Document>>,
    files: BTreeMap<(Box<str>, Box<str>), StoredFile>,
}

/// Process-local document and file store.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Backend without documents.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Backend loaded with the embedded seed documents.
    pub fn seeded() -> Result<Self> {
        let seed: BTreeMap<String, Vec<Document>> =
            serde_json::from_str(SEED_JSON).map_err(|error| {
                ErrorEnvelope::invariant(
                    ErrorCode::new("mock", "invalid_seed"),
                    format!("embedded mock seed is invalid: {error}"),
                )
            })?;
        let backend = Self::empty();
        {
            let mut state = backend.lock();
            for (collection, documents) in seed {
                state
                    .collections
                    .insert(collection.into_boxed_str(), documents);
            }
        }
        Ok(backend)
    }

    /// Replace the documents of one collection.
    #[must_use]
    pub fn with_documents(self, collection: &CollectionId, documents: Vec<Document>) -> Self {
        self.lock()
            .collections
            .insert(collection.as_str().into(), documents);
        self
    }

    /// Snapshot of one collection in insertion order.
    #[must_use]
    pub fn documents(&self, collection: &CollectionId) -> Vec<Document> {
        self.lock()
            .collections
            .get(collection.as_str())
            .cloned()
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn document_not_found(collection: &CollectionId, id: &DocumentId) -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::not_found(), "Document not found")
        .with_http_status(404)
        .with_metadata("collection", collection.as_str())
        .with_metadata("documentId", id.as_str())
}

fn not_implemented(operation: &'static str) -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::not_implemented(), NOT_IMPLEMENTED_IN_MOCK)
        .with_metadata("operation", operation)
}

fn matches_query(document: &Document, query: &DocumentQuery) -> bool {
    let filters_match = query
        .filters
        .iter()
        .all(|filter| document.get(&filter.field) == Some(&filter.value));
    if !filters_match {
        return false;
    }
    query.search.as_ref().is_none_or(|search| {
        let term = search.term.trim().to_lowercase();
        term.is_empty()
            || document
                .get(&search.field)
                .and_then(Value::as_str)
                .is_some_and(|value| value.to_lowercase().contains(&term))
    })
}

/// Orders two optional JSON values; missing or null values sort last in
/// either direction.
fn compare_values(
    left: Option<&Value>,
    right: Option<&Value>,
    direction: SortDirection,
) -> Ordering {
    let left = left.filter(|value| !value.is_null());
    let right = right.filter(|value| !value.is_null());
    let ordering = match (left, right) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Greater,
        (Some(_), None) => return Ordering::Less,
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
    };
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

fn merge_user_fields(target: &mut Document, data: DocumentData) {
    let fields = target.fields_mut();
    for (key, value) in data {
        if !key.starts_with(SYSTEM_FIELD_PREFIX) {
            fields.insert(key, value);
        }
    }
}

impl DocumentsPort for MockBackend {
    fn list_documents(
        &self,
        ctx: &RequestContext,
        collection: CollectionId,
        query: DocumentQuery,
    ) -> BoxFuture<'_, Result<DocumentPage>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("mock.list_documents")?;
            let mut matched: Vec<Document> = self
                .documents(&collection)
                .into_iter()
                .filter(|document| matches_query(document, &query))
                .collect();
            if let Some(order) = query.order.as_ref() {
                matched.sort_by(|a, b| {
                    compare_values(a.get(&order.field), b.get(&order.field), order.direction)
                });
            }

            let total = matched.len() as u64;
            let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
            let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
            let documents = matched.into_iter().skip(offset).take(limit).collect();
            Ok(DocumentPage { documents, total })
        })
    }

    fn get_document(
        &self,
        ctx: &RequestContext,
        collection: CollectionId,
        id: DocumentId,
    ) -> BoxFuture<'_, Result<Document>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("mock.get_document")?;
            self.lock()
                .collections
                .get(collection.as_str())
                .and_then(|documents| {
                    documents
                        .iter()
                        .find(|document| document.id() == Some(id.as_str()))
                })
                .cloned()
                .ok_or_else(|| document_not_found(&collection, &id))
        })
    }

    fn create_document(
        &self,
        ctx: &RequestContext,
        collection: CollectionId,
        data: DocumentData,
    ) -> BoxFuture<'_, Result<Document>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("mock.create_document")?;
            let now = now_timestamp();
            let mut document = Document::default();
            let fields = document.fields_mut();
            fields.insert(FIELD_ID.to_owned(), Value::String(generate_id()));
            fields.insert(FIELD_CREATED_AT.to_owned(), Value::String(now.clone()));
            fields.insert(FIELD_UPDATED_AT.to_owned(), Value::String(now));
            merge_user_fields(&mut document, data);

            self.lock()
                .collections
                .entry(collection.as_str().into())
                .or_default()
                .push(document.clone());
            Ok(document)
        })
    }

    fn update_document(
        &self,
        ctx: &RequestContext,
        collection: CollectionId,
        id: DocumentId,
        data: DocumentData,
    ) -> BoxFuture<'_, Result<Document>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("mock.update_document")?;
            let mut state = self.lock();
            let document = state
                .collections
                .get_mut(collection.as_str())
                .and_then(|documents| {
                    documents
                        .iter_mut()
                        .find(|document| document.id() == Some(id.as_str()))
                })
                .ok_or_else(|| document_not_found(&collection, &id))?;
            merge_user_fields(document, data);
            document
                .fields_mut()
                .insert(FIELD_UPDATED_AT.to_owned(), Value::String(now_timestamp()));
            Ok(document.clone())
        })
    }

    fn delete_document(
        &self,
        ctx: &RequestContext,
        collection: CollectionId,
        id: DocumentId,
    ) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("mock.delete_document")?;
            let mut state = self.lock();
            let documents = state
                .collections
                .get_mut(collection.as_str())
                .ok_or_else(|| document_not_found(&collection, &id))?;
            let position = documents
                .iter()
                .position(|document| document.id() == Some(id.as_str()))
                .ok_or_else(|| document_not_found(&collection, &id))?;
            documents.remove(position);
            Ok(())
        })
    }
}

impl FileStoragePort for MockBackend {
    fn upload_file(
        &self,
        ctx: &RequestContext,
        bucket: BucketId,
        file: FileUpload,
    ) -> BoxFuture<'_, Result<StoredFile>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("mock.upload_file")?;
            let stored = StoredFile {
                id: generate_id().into_boxed_str(),
                bucket_id: bucket.clone(),
                name: file.name,
                mime_type: file
                    .content_type
                    .unwrap_or_else(|| DEFAULT_MIME_TYPE.into()),
                size_original: file.bytes.len() as u64,
            };
            self.lock().files.insert(
                (bucket.as_str().into(), stored.id.clone()),
                stored.clone(),
            );
            Ok(stored)
        })
    }

    fn get_file(
        &self,
        ctx: &RequestContext,
        bucket: BucketId,
        file_id: Box<str>,
    ) -> BoxFuture<'_, Result<StoredFile>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("mock.get_file")?;
            self.lock()
                .files
                .get(&(bucket.as_str().into(), file_id.clone()))
                .cloned()
                .ok_or_else(|| {
                    ErrorEnvelope::expected(ErrorCode::not_found(), "File not found")
                        .with_http_status(404)
                        .with_metadata("bucket", bucket.as_str())
                        .with_metadata("fileId", file_id.as_ref())
                })
        })
    }

    fn delete_file(
        &self,
        ctx: &RequestContext,
        bucket: BucketId,
        file_id: Box<str>,
    ) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("mock.delete_file")?;
            self.lock()
                .files
                .remove(&(bucket.as_str().into(), file_id.clone()))
                .map(|_| ())
                .ok_or_else(|| {
                    ErrorEnvelope::expected(ErrorCode::not_found(), "File not found")
                        .with_http_status(404)
                        .with_metadata("bucket", bucket.as_str())
                        .with_metadata("fileId", file_id.as_ref())
                })
        })
    }

    fn file_download_url(&self, _bucket: &BucketId, _file_id: &str) -> Result<Box<str>> {
        Err(not_implemented("mock.file_download_url"))
    }

    fn file_preview_url(
        &self,
        _bucket: &BucketId,
        _file_id: &str,
        _size: PreviewSize,
    ) -> Result<Box<str>> {
        Err(not_implemented("mock.file_preview_url"))
    }
}
