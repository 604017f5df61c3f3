//! HTTP API for the anivert conversion service.
//!
//! A thin axum layer over the conversion core: one endpoint that takes a
//! source bucket/key and answers with either a signed URL to the
//! converted video or a "processing" acknowledgement.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
