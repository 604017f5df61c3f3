//! Object storage layer for the anivert service.
//!
//! This crate provides:
//! - The `ObjectStore` port used by the conversion core
//! - An S3-compatible client (`S3Client`) over the AWS SDK
//! - An in-memory store for tests and local development
//! - Presigned URL generation with playback response headers

pub mod client;
pub mod error;
pub mod memory;
pub mod store;

pub use client::{S3Client, S3Config};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use store::{ObjectStore, PresignOptions, UploadOptions};
