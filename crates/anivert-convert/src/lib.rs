//! Conversion orchestration for the anivert service.
//!
//! This crate wires the result cache, the storage-backed conversion lock,
//! the frame pipeline, the transcode pass and the publish step into a
//! single idempotent operation: convert a source video exactly once and
//! hand back a signed playback URL.

pub mod cache;
pub mod config;
pub mod convert;
pub mod error;
pub mod lock;
pub mod publish;

pub use cache::ResultCache;
pub use config::ConvertConfig;
pub use convert::{ConversionService, Outcome};
pub use error::{ConvertError, ConvertResult};
pub use lock::{ConversionLock, LockAcquisition};
pub use publish::Publisher;
