//! Request handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use anivert_convert::Outcome;
use anivert_models::SourceRef;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Conversion request body.
#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    /// Source bucket; falls back to the configured default
    pub s3_bucket: Option<String>,
    /// Source object key
    pub s3_key: String,
}

/// Successful conversion response.
#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub converted_video_url: String,
    pub expires_at: DateTime<Utc>,
}

/// In-progress response.
#[derive(Debug, Serialize)]
pub struct ProcessingResponse {
    pub status: String,
}

/// Convert a source video to anime style.
///
/// Returns 200 with a signed playback URL when the result is ready
/// (fresh or cached), or 202 when another request is already converting
/// the same source.
pub async fn convert(
    State(state): State<AppState>,
    Json(request): Json<ConvertRequest>,
) -> ApiResult<Response> {
    let bucket = request
        .s3_bucket
        .or_else(|| state.config.default_bucket.clone())
        .ok_or_else(|| ApiError::bad_request("No bucket specified and no default configured"))?;

    let source = SourceRef::new(bucket, request.s3_key)?;
    info!(source = %source, "Conversion requested");

    match state.converter.convert(&source).await? {
        Outcome::Completed(result) => Ok((
            StatusCode::OK,
            Json(ConvertResponse {
                converted_video_url: result.url,
                expires_at: result.expires_at,
            }),
        )
            .into_response()),
        Outcome::AlreadyProcessing => Ok((
            StatusCode::ACCEPTED,
            Json(ProcessingResponse {
                status: "processing".to_string(),
            }),
        )
            .into_response()),
    }
}
