//! Appwrite schema administration adapter.

use crate::appwrite::client::{AppwriteClient, AppwriteClientConfig};
use dernek_domain::{CollectionId, PermissionScope};
use dernek_ports::{
    AttributeRequest, BoxFuture, CollectionSpec, IndexRequest, RemoteCollection, SchemaAdminPort,
};
use dernek_shared::{ErrorEnvelope, RequestContext, Result};
use serde::Deserialize;
use serde_json::{Value, json};

/// Role granted collection permissions.
const PERMISSION_ROLE: &str = "users";

#[derive(Debug, Deserialize)]
struct CollectionBody {
    #[serde(rename = "$id")]
    id: String,
    name: String,
}

/// Appwrite collection, attribute, and index administration.
#[derive(Clone)]
pub struct AppwriteSchemaAdmin {
    client: AppwriteClient,
}

impl AppwriteSchemaAdmin {
    /// Creates the adapter. The configuration must carry an API key.
    pub fn new(config: &AppwriteClientConfig) -> Result<Self> {
        Ok(Self {
            client: AppwriteClient::new(config)?,
        })
    }

    fn collections_path(&self) -> String {
        format!("databases/{}/collections", self.client.database_id())
    }

    fn collection_path(&self, id: &CollectionId) -> String {
        format!("{}/{}", self.collections_path(), id.as_str())
    }
}

/// Permission strings for the granted scopes, e.g. `read("users")`.
#[must_use]
pub fn permission_strings(scopes: &[PermissionScope]) -> Vec<String> {
    scopes
        .iter()
        .map(|scope| format!("{}(\"{PERMISSION_ROLE}\")", scope.as_str()))
        .collect()
}

/// JSON body of an attribute creation call.
#[must_use]
pub fn attribute_body(attribute: &AttributeRequest) -> Value {
    match attribute {
        AttributeRequest::String {
            key,
            size,
            required,
            default,
        } => json!({ "key": key, "size": size, "required": required, "default": default }),
        AttributeRequest::Integer {
            key,
            required,
            min,
            max,
            default,
        } => json!({ "key": key, "required": required, "min": min, "max": max, "default": default }),
        AttributeRequest::Float {
            key,
            required,
            min,
            max,
            default,
        } => json!({ "key": key, "required": required, "min": min, "max": max, "default": default }),
        AttributeRequest::Boolean {
            key,
            required,
            default,
        } => json!({ "key": key, "required": required, "default": default }),
        AttributeRequest::Datetime {
            key,
            required,
            default,
        } => json!({ "key": key, "required": required, "default": default }),
        AttributeRequest::Enum {
            key,
            elements,
            required,
            default,
        } => json!({ "key": key, "elements": elements, "required": required, "default": default }),
    }
}

impl SchemaAdminPort for AppwriteSchemaAdmin {
    fn get_collection(
        &self,
        ctx: &RequestContext,
        id: CollectionId,
    ) -> BoxFuture<'_, Result<RemoteCollection>> {
        let ctx = ctx.clone();
        let adapter = self.clone();
        Box::pin(async move {
            let url = adapter.client.url(&adapter.collection_path(&id));
            let body: CollectionBody = adapter
                .client
                .send_json(&ctx, "appwrite.get_collection", |http| http.get(&url))
                .await?;
            Ok(RemoteCollection {
                id: CollectionId::parse(&body.id).map_err(ErrorEnvelope::from)?,
                name: body.name.into_boxed_str(),
            })
        })
    }

    fn create_collection(
        &self,
        ctx: &RequestContext,
        spec: CollectionSpec,
    ) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        let adapter = self.clone();
        Box::pin(async move {
            let url = adapter.client.url(&adapter.collections_path());
            let body = json!({
                "collectionId": spec.id.as_str(),
                "name": spec.name,
                "permissions": permission_strings(&spec.permissions),
                "documentSecurity": false,
            });
            adapter
                .client
                .send_unit(&ctx, "appwrite.create_collection", |http| {
                    http.post(&url).json(&body)
                })
                .await
        })
    }

    fn create_attribute(
        &self,
        ctx: &RequestContext,
        collection: CollectionId,
        attribute: AttributeRequest,
    ) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        let adapter = self.clone();
        Box::pin(async move {
            let url = adapter.client.url(&format!(
                "{}/attributes/{}",
                adapter.collection_path(&collection),
                attribute.kind()
            ));
            let body = attribute_body(&attribute);
            adapter
                .client
                .send_unit(&ctx, "appwrite.create_attribute", |http| {
                    http.post(&url).json(&body)
                })
                .await
        })
    }

    fn create_index(
        &self,
        ctx: &RequestContext,
        collection: CollectionId,
        index: IndexRequest,
    ) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        let adapter = self.clone();
        Box::pin(async move {
            let url = adapter
                .client
                .url(&format!("{}/indexes", adapter.collection_path(&collection)));
            let body = json!({
                "key": index.key,
                "type": index.kind.as_str(),
                "attributes": index.attributes,
            });
            adapter
                .client
                .send_unit(&ctx, "appwrite.create_index", |http| {
                    http.post(&url).json(&body)
                })
                .await
        })
    }

    fn delete_collection(
        &self,
        ctx: &RequestContext,
        id: CollectionId,
    ) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        let adapter = self.clone();
        Box::pin(async move {
            let url = adapter.client.url(&adapter.collection_path(&id));
            adapter
                .client
                .send_unit(&ctx, "appwrite.delete_collection", |http| http.delete(&url))
                .await
        })
    }
}
