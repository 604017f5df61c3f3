//! Conversion error types.

use thiserror::Error;

pub type ConvertResult<T> = Result<T, ConvertError>;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    Storage(#[from] anivert_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] anivert_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConvertError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether the source object itself is missing.
    pub fn is_source_missing(&self) -> bool {
        matches!(self, ConvertError::Storage(e) if e.is_not_found())
    }

    /// Whether storage credentials or permissions are the problem.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, ConvertError::Storage(e) if e.is_access_denied())
    }

    /// Whether the caller may retry the request as-is.
    ///
    /// Conversion performs no internal retries; a retried request is
    /// idempotent because the result cache short-circuits once output
    /// exists.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConvertError::Storage(e) if e.is_retryable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anivert_storage::StorageError;

    #[test]
    fn test_source_missing_classification() {
        let err = ConvertError::from(StorageError::not_found("k"));
        assert!(err.is_source_missing());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_transient_is_retryable() {
        let err = ConvertError::from(StorageError::Backend("timeout".into()));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_media_errors_not_retryable() {
        let err = ConvertError::from(anivert_media::MediaError::inference("bad frame"));
        assert!(!err.is_retryable());
    }
}
