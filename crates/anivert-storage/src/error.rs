//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
///
/// `NotFound` is the only expected, flow-driving variant (cache miss,
/// free lock); everything else aborts the current request. `Backend`
/// covers transient failures that are safe for the caller to retry.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to configure storage client: {0}")]
    ConfigError(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Access denied to {0}: check storage credentials and bucket permissions")]
    AccessDenied(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Presign failed: {0}")]
    PresignFailed(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    pub fn access_denied(key: impl Into<String>) -> Self {
        Self::AccessDenied(key.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::DownloadFailed(msg.into())
    }

    pub fn delete_failed(msg: impl Into<String>) -> Self {
        Self::DeleteFailed(msg.into())
    }

    /// Absence of an object, as opposed to a real failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }

    pub fn is_access_denied(&self) -> bool {
        matches!(self, StorageError::AccessDenied(_))
    }

    /// Safe for the caller to retry as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageError::Backend(_)
                | StorageError::UploadFailed(_)
                | StorageError::DownloadFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(StorageError::not_found("k").is_not_found());
        assert!(!StorageError::access_denied("k").is_not_found());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(StorageError::Backend("timeout".into()).is_retryable());
        assert!(!StorageError::access_denied("k").is_retryable());
        assert!(!StorageError::not_found("k").is_retryable());
    }

    #[test]
    fn test_access_denied_message_is_actionable() {
        let msg = StorageError::access_denied("bucket/key").to_string();
        assert!(msg.contains("credentials"));
    }
}
