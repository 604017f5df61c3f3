//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use anivert_convert::ConvertError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Conversion error: {0}")]
    Convert(ConvertError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Internal(_) | ApiError::Convert(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ConvertError> for ApiError {
    fn from(e: ConvertError) -> Self {
        if e.is_source_missing() {
            ApiError::NotFound("Source video not found".to_string())
        } else if e.is_access_denied() {
            ApiError::Forbidden("Storage access denied".to_string())
        } else {
            ApiError::Convert(e)
        }
    }
}

impl From<anivert_models::RefError> for ApiError {
    fn from(e: anivert_models::RefError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = match &self {
            ApiError::Internal(_) | ApiError::Convert(_) => {
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anivert_storage::StorageError;

    #[test]
    fn test_missing_source_maps_to_not_found() {
        let err = ApiError::from(ConvertError::from(StorageError::not_found("k")));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_access_denied_maps_to_forbidden() {
        let err = ApiError::from(ConvertError::from(StorageError::access_denied("k")));
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_invalid_ref_maps_to_bad_request() {
        let ref_err = anivert_models::SourceRef::new("b", "").unwrap_err();
        let err = ApiError::from(ref_err);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
