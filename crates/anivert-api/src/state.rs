//! Application state.

use std::sync::Arc;

use anivert_convert::{ConversionService, ConvertConfig};
use anivert_media::OnnxScorer;
use anivert_storage::S3Client;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub converter: Arc<ConversionService>,
}

impl AppState {
    /// Create new application state.
    ///
    /// Loads the storage client and the ONNX model up front so a
    /// misconfigured deployment fails at startup, not on first request.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let convert_config = ConvertConfig::from_env();

        let store = Arc::new(S3Client::from_env()?);
        let scorer = Arc::new(OnnxScorer::load(&convert_config.model_path)?);
        let converter = Arc::new(ConversionService::new(store, scorer, &convert_config));

        Ok(Self { config, converter })
    }

    /// Build state around an existing conversion service.
    pub fn with_converter(config: ApiConfig, converter: Arc<ConversionService>) -> Self {
        Self { config, converter }
    }
}
