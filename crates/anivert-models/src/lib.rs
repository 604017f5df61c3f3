//! Shared data models for the anivert conversion service.
//!
//! This crate provides Serde-serializable types for:
//! - Storage object references (source, output, lock)
//! - Video stream metadata
//! - Conversion results returned to clients

pub mod refs;
pub mod video;

pub use refs::{LockRef, OutputRef, RefError, SourceRef, CONVERTED_PREFIX, LOCK_SUFFIX};
pub use video::{ConversionResult, VideoMeta};
