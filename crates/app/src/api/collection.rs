//! CRUD sub-API bound to one collection.

use super::response::{ApiResponse, respond, respond_list};
use dernek_domain::{CollectionId, DocumentId};
use dernek_ports::{
    Document, DocumentData, DocumentQuery, DocumentsPort, EqualFilter, OrderBy, SearchClause,
    SortDirection,
};
use dernek_shared::{RequestContext, Result};
use serde_json::Value;
use std::sync::Arc;

/// Page size used when a collection declares none.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// List parameters accepted by every collection sub-API.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListParams {
    /// Page size; the collection default applies when unset.
    pub limit: Option<u32>,
    /// 1-based page number; `0` is treated as `1`.
    pub page: Option<u32>,
    /// Search term applied to the collection's search field.
    pub search: Option<String>,
    /// Field to order by, descending.
    pub order_by: Option<String>,
    /// Equality filters.
    pub filters: Vec<EqualFilter>,
}

impl ListParams {
    /// Set the page size.
    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the page number.
    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the search term.
    #[must_use]
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    /// Add an equality filter.
    #[must_use]
    pub fn filter(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(EqualFilter {
            field: field.into(),
            value: value.into(),
        });
        self
    }
}

/// How a collection is listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionProfile {
    /// Field searched by [`ListParams::search`].
    pub search_field: &'static str,
    /// Page size when the caller sets none.
    pub page_size: u32,
    /// Ordering applied when the caller sets none.
    pub default_order: Option<(&'static str, SortDirection)>,
}

impl CollectionProfile {
    /// Profile searching one field with the default page size and no ordering.
    #[must_use]
    pub const fn searching(search_field: &'static str) -> Self {
        Self {
            search_field,
            page_size: DEFAULT_PAGE_SIZE,
            default_order: None,
        }
    }

    /// Override the page size.
    #[must_use]
    pub const fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Newest first by `field`.
    #[must_use]
    pub const fn newest_first(mut self, field: &'static str) -> Self {
        self.default_order = Some((field, SortDirection::Desc));
        self
    }
}

/// CRUD operations for one collection.
#[derive(Clone)]
pub struct CollectionApi {
    collection: CollectionId,
    profile: CollectionProfile,
    documents: Arc<dyn DocumentsPort>,
}

impl CollectionApi {
    /// Bind a collection to a documents port.
    pub fn new(
        collection: CollectionId,
        profile: CollectionProfile,
        documents: Arc<dyn DocumentsPort>,
    ) -> Self {
        Self {
            collection,
            profile,
            documents,
        }
    }

    /// Collection served by this API.
    pub const fn collection(&self) -> &CollectionId {
        &self.collection
    }

    /// Listing profile.
    pub const fn profile(&self) -> CollectionProfile {
        self.profile
    }

    /// Build the port query for a list call.
    pub fn query(&self, params: &ListParams) -> DocumentQuery {
        let limit = params.limit.unwrap_or(self.profile.page_size).max(1);
        let page = params.page.unwrap_or(1).max(1);
        let search = params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(|term| SearchClause {
                field: self.profile.search_field.into(),
                term: term.into(),
            });
        let order = params
            .order_by
            .as_deref()
            .map(|field| OrderBy {
                field: field.into(),
                direction: SortDirection::Desc,
            })
            .or_else(|| {
                self.profile
                    .default_order
                    .map(|(field, direction)| OrderBy {
                        field: field.into(),
                        direction,
                    })
            });

        DocumentQuery {
            limit,
            offset: (page - 1).saturating_mul(limit),
            search,
            order,
            filters: params.filters.clone(),
        }
    }

    /// List one page of documents.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        params: ListParams,
    ) -> Result<ApiResponse<Vec<Document>>> {
        self.list_query(ctx, self.query(&params)).await
    }

    /// List with an explicit port query.
    pub async fn list_query(
        &self,
        ctx: &RequestContext,
        query: DocumentQuery,
    ) -> Result<ApiResponse<Vec<Document>>> {
        let result = self
            .documents
            .list_documents(ctx, self.collection.clone(), query)
            .await
            .map(|page| (page.documents, page.total));
        respond_list(result)
    }

    /// Fetch one document.
    pub async fn get(&self, ctx: &RequestContext, id: &str) -> Result<ApiResponse<Document>> {
        let result = match DocumentId::parse(id) {
            Ok(id) => {
                self.documents
                    .get_document(ctx, self.collection.clone(), id)
                    .await
            },
            Err(error) => Err(error.into()),
        };
        respond(result)
    }

    /// Create a document.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        data: DocumentData,
    ) -> Result<ApiResponse<Document>> {
        respond(
            self.documents
                .create_document(ctx, self.collection.clone(), data)
                .await,
        )
    }

    /// Merge fields into a document.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        data: DocumentData,
    ) -> Result<ApiResponse<Document>> {
        let result = match DocumentId::parse(id) {
            Ok(id) => {
                self.documents
                    .update_document(ctx, self.collection.clone(), id, data)
                    .await
            },
            Err(error) => Err(error.into()),
        };
        respond(result)
    }

    /// Set a single field.
    pub async fn update_field(
        &self,
        ctx: &RequestContext,
        id: &str,
        field: &str,
        value: impl Into<Value> + Send,
    ) -> Result<ApiResponse<Document>> {
        let mut data = DocumentData::new();
        data.insert(field.to_owned(), value.into());
        self.update(ctx, id, data).await
    }

    /// Delete a document.
    pub async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<ApiResponse<()>> {
        let result = match DocumentId::parse(id) {
            Ok(id) => {
                self.documents
                    .delete_document(ctx, self.collection.clone(), id)
                    .await
            },
            Err(error) => Err(error.into()),
        };
        respond(result)
    }
}

impl std::fmt::Debug for CollectionApi {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("CollectionApi")
            .field("collection", &self.collection)
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}
