//! Video metadata and conversion results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::refs::OutputRef;

/// Stream metadata read once when a conversion starts.
///
/// The output writer is sized from these values so that the converted
/// video keeps the source geometry and frame rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMeta {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Total frame count, when the container reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<u64>,
}

impl VideoMeta {
    /// Bytes per decoded RGB24 frame.
    pub fn frame_size_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Result of a successful conversion.
///
/// Created once per conversion and returned in the HTTP response; the
/// durable artifact lives in storage, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Time-limited signed URL for client playback
    pub url: String,
    /// When the signed URL expires
    pub expires_at: DateTime<Utc>,
    /// The output object the URL points to
    pub output: OutputRef,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size() {
        let meta = VideoMeta {
            width: 640,
            height: 480,
            fps: 30.0,
            frame_count: Some(100),
        };
        assert_eq!(meta.frame_size_bytes(), 640 * 480 * 3);
    }

    #[test]
    fn test_meta_serde_omits_unknown_frame_count() {
        let meta = VideoMeta {
            width: 64,
            height: 32,
            fps: 24.0,
            frame_count: None,
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert!(!json.contains("frame_count"));
    }
}
