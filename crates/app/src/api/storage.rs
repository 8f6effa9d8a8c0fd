//! File storage sub-API.

use super::response::{ApiResponse, respond};
use dernek_domain::BucketId;
use dernek_ports::{FileStoragePort, FileUpload, PreviewSize, StoredFile};
use dernek_shared::{RequestContext, Result};
use std::sync::Arc;

/// Bucket file operations.
#[derive(Clone)]
pub struct StorageApi {
    storage: Arc<dyn FileStoragePort>,
}

impl StorageApi {
    /// Wrap a storage port.
    pub fn new(storage: Arc<dyn FileStoragePort>) -> Self {
        Self { storage }
    }

    /// Upload a file into a bucket.
    pub async fn upload_file(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        file: FileUpload,
    ) -> Result<ApiResponse<StoredFile>> {
        let result = match BucketId::parse(bucket) {
            Ok(bucket) => self.storage.upload_file(ctx, bucket, file).await,
            Err(error) => Err(error.into()),
        };
        respond(result)
    }

    /// Fetch file metadata.
    pub async fn get_file(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        file_id: &str,
    ) -> Result<ApiResponse<StoredFile>> {
        let result = match BucketId::parse(bucket) {
            Ok(bucket) => self.storage.get_file(ctx, bucket, file_id.into()).await,
            Err(error) => Err(error.into()),
        };
        respond(result)
    }

    /// Delete a file.
    pub async fn delete_file(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        file_id: &str,
    ) -> Result<ApiResponse<()>> {
        let result = match BucketId::parse(bucket) {
            Ok(bucket) => self.storage.delete_file(ctx, bucket, file_id.into()).await,
            Err(error) => Err(error.into()),
        };
        respond(result)
    }

    /// Download URL of a file.
    pub fn file_download_url(&self, bucket: &str, file_id: &str) -> Result<ApiResponse<String>> {
        respond(
            BucketId::parse(bucket)
                .map_err(Into::into)
                .and_then(|bucket| self.storage.file_download_url(&bucket, file_id))
                .map(String::from),
        )
    }

    /// Preview URL of a file, optionally resized.
    pub fn file_preview_url(
        &self,
        bucket: &str,
        file_id: &str,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<ApiResponse<String>> {
        respond(
            BucketId::parse(bucket)
                .map_err(Into::into)
                .and_then(|bucket| {
                    self.storage
                        .file_preview_url(&bucket, file_id, PreviewSize { width, height })
                })
                .map(String::from),
        )
    }
}

impl std::fmt::Debug for StorageApi {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("StorageApi").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::response::MESSAGE_NOT_IMPLEMENTED;
    use dernek_adapters::mock::MockBackend;

    #[tokio::test]
    async fn mock_storage_round_trips_metadata() -> Result<()> {
        let api = StorageApi::new(Arc::new(MockBackend::empty()));
        let ctx = RequestContext::new_request();

        let uploaded = api
            .upload_file(
                &ctx,
                "receipts",
                FileUpload {
                    name: "makbuz.pdf".into(),
                    content_type: Some("application/pdf".into()),
                    bytes: b"%PDF-1.7".to_vec(),
                },
            )
            .await?;
        let stored = uploaded.data.ok_or_else(|| {
            dernek_shared::ErrorEnvelope::invariant(
                dernek_shared::ErrorCode::internal(),
                "upload returned no data",
            )
        })?;

        let fetched = api.get_file(&ctx, "receipts", &stored.id).await?;
        assert_eq!(fetched.data.map(|file| file.name), Some("makbuz.pdf".into()));

        assert!(api.delete_file(&ctx, "receipts", &stored.id).await?.is_ok());
        let missing = api.get_file(&ctx, "receipts", &stored.id).await?;
        assert!(missing.error.is_some());
        Ok(())
    }

    #[test]
    fn mock_urls_are_not_implemented() -> Result<()> {
        let api = StorageApi::new(Arc::new(MockBackend::empty()));

        let download = api.file_download_url("documents", "file-1")?;
        let preview = api.file_preview_url("photos", "file-1", Some(64), None)?;

        assert_eq!(download.error.as_deref(), Some(MESSAGE_NOT_IMPLEMENTED));
        assert_eq!(preview.error.as_deref(), Some(MESSAGE_NOT_IMPLEMENTED));
        assert!(download.data.is_none());
        Ok(())
    }
}
