//! Appwrite bucket storage adapter.

use crate::appwrite::client::{AppwriteClient, AppwriteClientConfig};
use crate::appwrite::documents::UNIQUE_ID;
use dernek_domain::BucketId;
use dernek_ports::{BoxFuture, FileStoragePort, FileUpload, PreviewSize, StoredFile};
use dernek_shared::{ErrorCode, ErrorEnvelope, RequestContext, Result};
use reqwest::multipart::{Form, Part};
use url::Url;

/// Appwrite storage adapter.
#[derive(Clone)]
pub struct AppwriteStorage {
    client: AppwriteClient,
}

impl AppwriteStorage {
    /// Creates the adapter.
    pub fn new(config: &AppwriteClientConfig) -> Result<Self> {
        Ok(Self {
            client: AppwriteClient::new(config)?,
        })
    }

    fn files_url(&self, bucket: &BucketId) -> String {
        self.client
            .url(&format!("storage/buckets/{}/files", bucket.as_str()))
    }

    fn file_url(&self, bucket: &BucketId, file_id: &str) -> String {
        format!("{}/{file_id}", self.files_url(bucket))
    }

    fn public_url(&self, bucket: &BucketId, file_id: &str, action: &str) -> Result<Url> {
        let raw = format!("{}/{action}", self.file_url(bucket, file_id));
        let mut url = Url::parse(&raw).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                format!("invalid file URL: {error}"),
            )
            .with_metadata("url", raw.clone())
        })?;
        url.query_pairs_mut()
            .append_pair("project", self.client.project_id());
        Ok(url)
    }
}

fn upload_form(file: &FileUpload) -> Form {
    let part = || Part::bytes(file.bytes.clone()).file_name(file.name.to_string());
    let part = match file.content_type.as_deref() {
        Some(content_type) => part().mime_str(content_type).unwrap_or_else(|_| part()),
        None => part(),
    };
    Form::new().text("fileId", UNIQUE_ID).part("file", part)
}

fn ensure_file_id(file_id: &str) -> Result<()> {
    if file_id.trim().is_empty() {
        return Err(ErrorEnvelope::expected(
            ErrorCode::invalid_input(),
            "file id must be non-empty",
        ));
    }
    Ok(())
}

impl FileStoragePort for AppwriteStorage {
    fn upload_file(
        &self,
        ctx: &RequestContext,
        bucket: BucketId,
        file: FileUpload,
    ) -> BoxFuture<'_, Result<StoredFile>> {
        let ctx = ctx.clone();
        let adapter = self.clone();
        Box::pin(async move {
            let url = adapter.files_url(&bucket);
            adapter
                .client
                .send_json(&ctx, "appwrite.upload_file", |http| {
                    http.post(&url).multipart(upload_form(&file))
                })
                .await
        })
    }

    fn get_file(
        &self,
        ctx: &RequestContext,
        bucket: BucketId,
        file_id: Box<str>,
    ) -> BoxFuture<'_, Result<StoredFile>> {
        let ctx = ctx.clone();
        let adapter = self.clone();
        Box::pin(async move {
            ensure_file_id(&file_id)?;
            let url = adapter.file_url(&bucket, &file_id);
            adapter
                .client
                .send_json(&ctx, "appwrite.get_file", |http| http.get(&url))
                .await
        })
    }

    fn delete_file(
        &self,
        ctx: &RequestContext,
        bucket: BucketId,
        file_id: Box<str>,
    ) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        let adapter = self.clone();
        Box::pin(async move {
            ensure_file_id(&file_id)?;
            let url = adapter.file_url(&bucket, &file_id);
            adapter
                .client
                .send_unit(&ctx, "appwrite.delete_file", |http| http.delete(&url))
                .await
        })
    }

    fn file_download_url(&self, bucket: &BucketId, file_id: &str) -> Result<Box<str>> {
        ensure_file_id(file_id)?;
        Ok(self.public_url(bucket, file_id, "download")?.as_str().into())
    }

    fn file_preview_url(
        &self,
        bucket: &BucketId,
        file_id: &str,
        size: PreviewSize,
    ) -> Result<Box<str>> {
        ensure_file_id(file_id)?;
        let mut url = self.public_url(bucket, file_id, "preview")?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(width) = size.width {
                pairs.append_pair("width", &width.to_string());
            }
            if let Some(height) = size.height {
                pairs.append_pair("height", &height.to_string());
            }
        }
        Ok(url.as_str().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dernek_shared::RetryPolicy;

    fn storage() -> Result<AppwriteStorage> {
        AppwriteStorage::new(&AppwriteClientConfig {
            endpoint: "https://cloud.appwrite.io/v1".into(),
            project_id: "p1".into(),
            database_id: "dernek_db".into(),
            api_key: None,
            timeout_ms: 1_000,
            retry: RetryPolicy::NONE,
        })
    }

    #[test]
    fn download_url_carries_project() -> Result<()> {
        let url = storage()?.file_download_url(&BucketId::from_static("receipts"), "f1")?;
        assert_eq!(
            url.as_ref(),
            "https://cloud.appwrite.io/v1/storage/buckets/receipts/files/f1/download?project=p1"
        );
        Ok(())
    }

    #[test]
    fn preview_url_appends_dimensions() -> Result<()> {
        let url = storage()?.file_preview_url(
            &BucketId::from_static("photos"),
            "f2",
            PreviewSize {
                width: Some(200),
                height: None,
            },
        )?;
        assert!(url.ends_with("/photos/files/f2/preview?project=p1&width=200"));
        Ok(())
    }

    #[test]
    fn blank_file_id_is_rejected() -> Result<()> {
        let error = storage()?
            .file_download_url(&BucketId::from_static("photos"), " ")
            .err();
        assert_eq!(error.map(|error| error.code), Some(ErrorCode::invalid_input()));
        Ok(())
    }
}
