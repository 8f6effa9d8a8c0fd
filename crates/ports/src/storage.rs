//! File storage boundary contract.

use crate::BoxFuture;
use dernek_domain::BucketId;
use dernek_shared::{RequestContext, Result};
use serde::{Deserialize, Serialize};

/// File to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    /// Original file name.
    pub name: Box<str>,
    /// MIME type, when known.
    pub content_type: Option<Box<str>>,
    /// File bytes.
    pub bytes: Vec<u8>,
}

/// Stored file metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    /// File id.
    #[serde(rename = "$id")]
    pub id: Box<str>,
    /// Owning bucket.
    pub bucket_id: BucketId,
    /// File name.
    pub name: Box<str>,
    /// MIME type.
    pub mime_type: Box<str>,
    /// Size in bytes.
    pub size_original: u64,
}

/// Preview dimensions; `None` keeps the original size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreviewSize {
    /// Width in pixels.
    pub width: Option<u32>,
    /// Height in pixels.
    pub height: Option<u32>,
}

/// Boundary contract for bucket file storage.
pub trait FileStoragePort: Send + Sync {
    /// Upload a file with a generated id.
    fn upload_file(
        &self,
        ctx: &RequestContext,
        bucket: BucketId,
        file: FileUpload,
    ) -> BoxFuture<'_, Result<StoredFile>>;

    /// Fetch file metadata.
    fn get_file(
        &self,
        ctx: &RequestContext,
        bucket: BucketId,
        file_id: Box<str>,
    ) -> BoxFuture<'_, Result<StoredFile>>;

    /// Delete a file.
    fn delete_file(
        &self,
        ctx: &RequestContext,
        bucket: BucketId,
        file_id: Box<str>,
    ) -> BoxFuture<'_, Result<()>>;

    /// URL that downloads the file.
    fn file_download_url(&self, bucket: &BucketId, file_id: &str) -> Result<Box<str>>;

    /// URL that renders a preview of the file.
    fn file_preview_url(
        &self,
        bucket: &BucketId,
        file_id: &str,
        size: PreviewSize,
    ) -> Result<Box<str>>;
}
