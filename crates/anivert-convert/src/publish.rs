//! Result publishing.
//!
//! Uploads the finished video to its derived output key with public-read
//! visibility and mints a time-limited signed playback URL. The same URL
//! minting path serves cache hits, so a request that short-circuits on an
//! existing result gets an identical response shape.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::info;

use anivert_models::{ConversionResult, OutputRef};
use anivert_storage::{ObjectStore, PresignOptions, UploadOptions};

use crate::error::ConvertResult;

/// Publishes converted videos and mints signed URLs for them.
#[derive(Clone)]
pub struct Publisher {
    store: Arc<dyn ObjectStore>,
    url_expiry: Duration,
}

impl Publisher {
    pub fn new(store: Arc<dyn ObjectStore>, url_expiry: Duration) -> Self {
        Self { store, url_expiry }
    }

    /// Upload the finished video and return its signed URL.
    pub async fn publish(&self, path: &Path, output: &OutputRef) -> ConvertResult<ConversionResult> {
        self.store
            .upload_file(path, &output.bucket, &output.key, &UploadOptions::public_video())
            .await?;
        info!(output = %output, "Converted video published");
        self.signed_url(output).await
    }

    /// Mint a signed playback URL for an output that already exists.
    pub async fn signed_url(&self, output: &OutputRef) -> ConvertResult<ConversionResult> {
        let url = self
            .store
            .presign_get(
                &output.bucket,
                &output.key,
                &PresignOptions::inline_video(self.url_expiry),
            )
            .await?;

        let expiry = chrono::Duration::from_std(self.url_expiry)
            .unwrap_or(chrono::Duration::MAX);

        Ok(ConversionResult {
            url,
            expires_at: Utc::now() + expiry,
            output: output.clone(),
        })
    }
}
