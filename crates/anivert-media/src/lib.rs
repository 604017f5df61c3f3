//! Media processing for the anivert service.
//!
//! This crate provides:
//! - FFprobe metadata extraction
//! - The per-frame stylization pipeline over FFmpeg rawvideo pipes
//! - Normalize/denormalize transforms bridging pixels and model tensors
//! - The `FrameScorer` boundary and its ONNX Runtime implementation
//! - The faststart H.264 transcode pass

pub mod command;
pub mod error;
pub mod pipeline;
pub mod probe;
pub mod scorer;
pub mod tensor;
pub mod transcode;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand};
pub use error::{MediaError, MediaResult};
pub use pipeline::FramePipeline;
pub use probe::probe_video;
pub use scorer::{FrameScorer, OnnxScorer};
pub use tensor::{stylize_frame, Frame, MODEL_GRANULARITY};
pub use transcode::transcode_faststart;
