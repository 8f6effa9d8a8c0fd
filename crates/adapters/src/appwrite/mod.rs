//! Appwrite REST adapters (schema, documents, storage, probes).

mod client;
mod documents;
mod error;
mod probe;
mod schema;
mod storage;

pub use client::{AppwriteClient, AppwriteClientConfig, KEY_HEADER, PROJECT_HEADER};
pub use documents::{AppwriteDocuments, UNIQUE_ID, query_strings};
pub use error::{map_status_error, map_transport_error};
pub use probe::AppwriteConnectivityProbe;
pub use schema::{AppwriteSchemaAdmin, attribute_body, permission_strings};
pub use storage::AppwriteStorage;
