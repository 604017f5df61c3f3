//! Conversion configuration.

use std::time::Duration;

/// Configuration for the conversion service.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Directory for per-conversion scratch space
    pub work_dir: String,
    /// Path to the ONNX style transfer model
    pub model_path: String,
    /// Age after which a lock marker is considered stale and reclaimable
    pub lock_ttl: Duration,
    /// Validity window for signed result URLs
    pub url_expiry: Duration,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            work_dir: "/tmp/anivert".to_string(),
            model_path: "models/Paprika_54.onnx".to_string(),
            lock_ttl: Duration::from_secs(3600),
            url_expiry: Duration::from_secs(86400), // 24 hours
        }
    }
}

impl ConvertConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/tmp/anivert".to_string()),
            model_path: std::env::var("MODEL_PATH")
                .unwrap_or_else(|_| "models/Paprika_54.onnx".to_string()),
            lock_ttl: Duration::from_secs(
                std::env::var("LOCK_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
            url_expiry: Duration::from_secs(
                std::env::var("URL_EXPIRY_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(86400),
            ),
        }
    }
}
