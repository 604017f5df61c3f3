//! Object storage port.
//!
//! The conversion core talks to storage through this trait so the same
//! cache/lock/publish logic runs against S3 in production and against
//! the in-memory store in tests.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StorageResult;

/// Options for uploads.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// MIME content type stored with the object
    pub content_type: String,
    /// Whether the object is uploaded with public-read visibility
    pub public_read: bool,
}

impl UploadOptions {
    /// Public-read MP4 upload, the shape every published artifact uses.
    pub fn public_video() -> Self {
        Self {
            content_type: "video/mp4".to_string(),
            public_read: true,
        }
    }
}

/// Options for presigned GET URLs.
#[derive(Debug, Clone)]
pub struct PresignOptions {
    /// URL validity window
    pub expires_in: Duration,
    /// Override for the response Content-Type header
    pub response_content_type: Option<String>,
    /// Override for the response Content-Disposition header
    pub response_content_disposition: Option<String>,
}

impl PresignOptions {
    /// Inline video playback with the given validity window.
    pub fn inline_video(expires_in: Duration) -> Self {
        Self {
            expires_in,
            response_content_type: Some("video/mp4".to_string()),
            response_content_disposition: Some("inline".to_string()),
        }
    }
}

/// Port over an S3-style object store.
///
/// All operations take an explicit bucket because conversion requests
/// name their own source bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Metadata-only existence probe.
    ///
    /// Returns `Ok(false)` for absence; any other failure (credentials,
    /// transport) surfaces as an error, never as a silent miss.
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool>;

    /// Fetch an object's content.
    async fn get_bytes(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>>;

    /// Download an object to a local file.
    async fn download_file(&self, bucket: &str, key: &str, path: &Path) -> StorageResult<()>;

    /// Upload a local file.
    async fn upload_file(
        &self,
        path: &Path,
        bucket: &str,
        key: &str,
        options: &UploadOptions,
    ) -> StorageResult<()>;

    /// Atomically create an object if it does not already exist.
    ///
    /// Returns `Ok(true)` when this call created the object and
    /// `Ok(false)` when it already existed.
    async fn put_if_absent(&self, bucket: &str, key: &str, body: Vec<u8>) -> StorageResult<bool>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()>;

    /// Mint a time-limited signed GET URL.
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        options: &PresignOptions,
    ) -> StorageResult<String>;
}
