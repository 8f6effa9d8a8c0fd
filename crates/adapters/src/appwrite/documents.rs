//! Appwrite document CRUD adapter.

use crate::appwrite::client::{AppwriteClient, AppwriteClientConfig};
use dernek_domain::{CollectionId, DocumentId};
use dernek_ports::{
    BoxFuture, Document, DocumentData, DocumentPage, DocumentQuery, DocumentsPort, SortDirection,
};
use dernek_shared::{RequestContext, Result};
use serde::Deserialize;
use serde_json::{Value, json};

/// Placeholder asking the backend to generate an id.
pub const UNIQUE_ID: &str = "unique()";

#[derive(Debug, Deserialize)]
struct DocumentListBody {
    total: u64,
    #[serde(default)]
    documents: Vec<Document>,
}

/// Appwrite documents adapter bound to one database.
#[derive(Clone)]
pub struct AppwriteDocuments {
    client: AppwriteClient,
}

impl AppwriteDocuments {
    /// Creates the adapter.
    pub fn new(config: &AppwriteClientConfig) -> Result<Self> {
        Ok(Self {
            client: AppwriteClient::new(config)?,
        })
    }

    fn documents_url(&self, collection: &CollectionId) -> String {
        self.client.url(&format!(
            "databases/{}/collections/{}/documents",
            self.client.database_id(),
            collection.as_str()
        ))
    }

    fn document_url(&self, collection: &CollectionId, id: &DocumentId) -> String {
        format!("{}/{}", self.documents_url(collection), id.as_str())
    }
}

/// Encodes a list query as the backend's JSON query strings.
#[must_use]
pub fn query_strings(query: &DocumentQuery) -> Vec<String> {
    let mut queries = vec![
        json!({ "method": "limit", "values": [query.limit] }),
        json!({ "method": "offset", "values": [query.offset] }),
    ];
    if let Some(search) = query.search.as_ref() {
        queries.push(json!({
            "method": "search",
            "attribute": search.field,
            "values": [search.term],
        }));
    }
    if let Some(order) = query.order.as_ref() {
        let method = match order.direction {
            SortDirection::Asc => "orderAsc",
            SortDirection::Desc => "orderDesc",
        };
        queries.push(json!({ "method": method, "attribute": order.field }));
    }
    for filter in &query.filters {
        queries.push(json!({
            "method": "equal",
            "attribute": filter.field,
            "values": [filter.value],
        }));
    }
    queries.iter().map(Value::to_string).collect()
}

impl DocumentsPort for AppwriteDocuments {
    fn list_documents(
        &self,
        ctx: &RequestContext,
        collection: CollectionId,
        query: DocumentQuery,
    ) -> BoxFuture<'_, Result<DocumentPage>> {
        let ctx = ctx.clone();
        let adapter = self.clone();
        Box::pin(async move {
            let url = adapter.documents_url(&collection);
            let params: Vec<(&str, String)> = query_strings(&query)
                .into_iter()
                .map(|query| ("queries[]", query))
                .collect();
            let body: DocumentListBody = adapter
                .client
                .send_json(&ctx, "appwrite.list_documents", |http| {
                    http.get(&url).query(&params)
                })
                .await?;
            Ok(DocumentPage {
                documents: body.documents,
                total: body.total,
            })
        })
    }

    fn get_document(
        &self,
        ctx: &RequestContext,
        collection: CollectionId,
        id: DocumentId,
    ) -> BoxFuture<'_, Result<Document>> {
        let ctx = ctx.clone();
        let adapter = self.clone();
        Box::pin(async move {
            let url = adapter.document_url(&collection, &id);
            adapter
                .client
                .send_json(&ctx, "appwrite.get_document", |http| http.get(&url))
                .await
        })
    }

    fn create_document(
        &self,
        ctx: &RequestContext,
        collection: CollectionId,
        data: DocumentData,
    ) -> BoxFuture<'_, Result<Document>> {
        let ctx = ctx.clone();
        let adapter = self.clone();
        Box::pin(async move {
            let url = adapter.documents_url(&collection);
            let body = json!({ "documentId": UNIQUE_ID, "data": data });
            adapter
                .client
                .send_json(&ctx, "appwrite.create_document", |http| {
                    http.post(&url).json(&body)
                })
                .await
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
        let adapter = self.clone();
        Box::pin(async move {
            let url = adapter.document_url(&collection, &id);
            let body = json!({ "data": data });
            adapter
                .client
                .send_json(&ctx, "appwrite.update_document", |http| {
                    http.patch(&url).json(&body)
                })
                .await
        })
    }

    fn delete_document(
        &self,
        ctx: &RequestContext,
        collection: CollectionId,
        id: DocumentId,
    ) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        let adapter = self.clone();
        Box::pin(async move {
            let url = adapter.document_url(&collection, &id);
            adapter
                .client
                .send_unit(&ctx, "appwrite.delete_document", |http| http.delete(&url))
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dernek_ports::{EqualFilter, OrderBy, SearchClause};

    #[test]
    fn query_strings_cover_every_clause() -> std::result::Result<(), serde_json::Error> {
        let query = DocumentQuery {
            limit: 10,
            offset: 20,
            search: Some(SearchClause {
                field: "name".into(),
                term: "Ayşe".into(),
            }),
            order: Some(OrderBy {
                field: "$createdAt".into(),
                direction: SortDirection::Desc,
            }),
            filters: vec![EqualFilter {
                field: "status".into(),
                value: json!("active"),
            }],
        };

        let parsed = query_strings(&query)
            .iter()
            .map(|query| serde_json::from_str::<Value>(query))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        assert_eq!(
            parsed,
            vec![
                json!({ "method": "limit", "values": [10] }),
                json!({ "method": "offset", "values": [20] }),
                json!({ "method": "search", "attribute": "name", "values": ["Ayşe"] }),
                json!({ "method": "orderDesc", "attribute": "$createdAt" }),
                json!({ "method": "equal", "attribute": "status", "values": ["active"] }),
            ]
        );
        Ok(())
    }

    #[test]
    fn default_query_only_pages() {
        assert_eq!(query_strings(&DocumentQuery::default()).len(), 2);
    }
}
