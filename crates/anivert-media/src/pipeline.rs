//! The per-frame stylization pipeline.
//!
//! Decodes the source into a stream of RGB24 frames over an FFmpeg
//! rawvideo pipe, runs each frame through the scorer, and feeds the
//! stylized frames into a second FFmpeg process that writes the
//! intermediate container. Frames are processed strictly in order and at
//! most one decoded and one stylized frame are alive at a time.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use anivert_models::VideoMeta;

use crate::command::check_ffmpeg;
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_video;
use crate::scorer::FrameScorer;
use crate::tensor::{model_dims, stylize_frame, Frame, MODEL_GRANULARITY};

/// Converts a source video into its stylized counterpart.
pub struct FramePipeline {
    scorer: Arc<dyn FrameScorer>,
}

impl FramePipeline {
    /// Create a pipeline around a shared scorer.
    pub fn new(scorer: Arc<dyn FrameScorer>) -> Self {
        Self { scorer }
    }

    /// Convert `input` into a stylized intermediate video at `output`.
    ///
    /// The output writer is sized to the original width, height and frame
    /// rate, so the converted video keeps the source geometry even though
    /// the model works on crop-to-32 frames.
    pub async fn convert(&self, input: &Path, output: &Path) -> MediaResult<VideoMeta> {
        check_ffmpeg()?;

        let meta = probe_video(input).await?;
        if model_dims(meta.width, meta.height).is_none() {
            return Err(MediaError::InvalidVideo(format!(
                "Video {}x{} is smaller than the model granularity of {}px",
                meta.width, meta.height, MODEL_GRANULARITY
            )));
        }

        debug!(
            width = meta.width,
            height = meta.height,
            fps = meta.fps,
            frames = ?meta.frame_count,
            "Starting frame pipeline"
        );

        let mut decoder = spawn_decoder(input)?;
        let mut encoder = spawn_encoder(output, &meta)?;

        let decoded = decoder
            .stdout
            .take()
            .ok_or_else(|| MediaError::decode_failed("Failed to capture decoder stdout", None))?;
        let sink = encoder
            .stdin
            .take()
            .ok_or_else(|| MediaError::encode_failed("Failed to open encoder stdin", None))?;

        let decoder_stderr = capture_stderr(&mut decoder);
        let encoder_stderr = capture_stderr(&mut encoder);

        let frames = copy_styled(&meta, decoded, sink, self.scorer.as_ref()).await;

        // Reap both children before inspecting the loop result so a failed
        // frame doesn't leave zombie processes behind.
        let decoder_status = decoder.wait().await?;
        let encoder_status = encoder.wait().await?;

        let frames = frames?;

        if !decoder_status.success() {
            return Err(MediaError::decode_failed(
                "FFmpeg decoder exited with non-zero status",
                drain_stderr(decoder_stderr).await,
            ));
        }
        if !encoder_status.success() {
            return Err(MediaError::encode_failed(
                "FFmpeg encoder exited with non-zero status",
                drain_stderr(encoder_stderr).await,
            ));
        }

        info!(frames, output = %output.display(), "Frame pipeline complete");
        Ok(meta)
    }
}

/// Spawn the decoding FFmpeg process emitting RGB24 rawvideo on stdout.
fn spawn_decoder(input: &Path) -> MediaResult<Child> {
    Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(input)
        .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| MediaError::decode_failed(format!("Failed to spawn FFmpeg decoder: {}", e), None))
}

/// Spawn the encoding FFmpeg process consuming RGB24 rawvideo on stdin.
///
/// Sized to the original geometry and frame rate of the source.
fn spawn_encoder(output: &Path, meta: &VideoMeta) -> MediaResult<Child> {
    Command::new("ffmpeg")
        .args([
            "-y",
            "-v",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-video_size",
            &format!("{}x{}", meta.width, meta.height),
            "-framerate",
            &format!("{:.3}", meta.fps),
            "-i",
            "-",
            "-an",
            "-c:v",
            "mpeg4",
            "-q:v",
            "5",
        ])
        .arg(output)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| MediaError::encode_failed(format!("Failed to spawn FFmpeg encoder: {}", e), None))
}

/// Collect a child's stderr in the background.
fn capture_stderr(child: &mut Child) -> Option<JoinHandle<String>> {
    let mut stderr = child.stderr.take()?;
    Some(tokio::spawn(async move {
        let mut buf = String::new();
        let _ = stderr.read_to_string(&mut buf).await;
        buf
    }))
}

async fn drain_stderr(handle: Option<JoinHandle<String>>) -> Option<String> {
    match handle {
        Some(h) => h.await.ok().filter(|s| !s.is_empty()),
        None => None,
    }
}

/// Read frames from `reader`, stylize each, and write them to `writer` in
/// the same order.
///
/// Generic over the byte streams so tests can drive it with in-memory
/// buffers. Returns the number of frames processed; an empty stream is a
/// valid zero-frame conversion.
pub(crate) async fn copy_styled<R, W>(
    meta: &VideoMeta,
    mut reader: R,
    mut writer: W,
    scorer: &dyn FrameScorer,
) -> MediaResult<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let frame_bytes = meta.frame_size_bytes();
    let mut buf = vec![0u8; frame_bytes];
    let mut frames = 0u64;

    loop {
        match read_frame(&mut reader, &mut buf).await? {
            FrameRead::Complete => {}
            FrameRead::EndOfStream => break,
        }

        let frame = Frame::new(meta.width, meta.height, buf.clone())?;
        let styled = stylize_frame(scorer, &frame)?;

        writer
            .write_all(&styled.data)
            .await
            .map_err(|e| MediaError::encode_failed(format!("Failed to write frame: {}", e), None))?;

        frames += 1;
    }

    writer
        .shutdown()
        .await
        .map_err(|e| MediaError::encode_failed(format!("Failed to close output stream: {}", e), None))?;

    Ok(frames)
}

enum FrameRead {
    Complete,
    EndOfStream,
}

/// Fill `buf` with exactly one frame, distinguishing a clean end-of-stream
/// from a truncated frame.
async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
    buf: &mut [u8],
) -> MediaResult<FrameRead> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader
            .read(&mut buf[filled..])
            .await
            .map_err(|e| MediaError::decode_failed(format!("Failed to read frame: {}", e), None))?;
        if n == 0 {
            if filled == 0 {
                return Ok(FrameRead::EndOfStream);
            }
            return Err(MediaError::decode_failed(
                format!("Truncated frame: got {} of {} bytes", filled, buf.len()),
                None,
            ));
        }
        filled += n;
    }
    Ok(FrameRead::Complete)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;
    use std::io::Cursor;

    struct IdentityScorer;

    impl FrameScorer for IdentityScorer {
        fn score(&self, input: Array4<f32>) -> MediaResult<Array4<f32>> {
            Ok(input)
        }
    }

    struct FailingScorer;

    impl FrameScorer for FailingScorer {
        fn score(&self, _input: Array4<f32>) -> MediaResult<Array4<f32>> {
            Err(MediaError::inference("model exploded"))
        }
    }

    fn meta_32() -> VideoMeta {
        VideoMeta {
            width: 32,
            height: 32,
            fps: 24.0,
            frame_count: None,
        }
    }

    fn solid_frame_bytes(value: u8) -> Vec<u8> {
        vec![value; 32 * 32 * 3]
    }

    #[tokio::test]
    async fn test_order_preservation() {
        // Frames tagged by their solid pixel value come out in input order.
        let meta = meta_32();
        let markers = [10u8, 20, 30, 40, 50];
        let mut input = Vec::new();
        for &m in &markers {
            input.extend(solid_frame_bytes(m));
        }

        let mut output = Cursor::new(Vec::new());
        let frames = copy_styled(&meta, input.as_slice(), &mut output, &IdentityScorer)
            .await
            .unwrap();

        assert_eq!(frames, markers.len() as u64);
        let out = output.into_inner();
        assert_eq!(out.len(), markers.len() * meta.frame_size_bytes());
        for (i, &m) in markers.iter().enumerate() {
            let frame = &out[i * meta.frame_size_bytes()..(i + 1) * meta.frame_size_bytes()];
            assert!(frame.iter().all(|&v| v == m), "frame {} marker mismatch", i);
        }
    }

    #[tokio::test]
    async fn test_empty_input_is_valid() {
        let meta = meta_32();
        let mut output = Cursor::new(Vec::new());
        let frames = copy_styled(&meta, [].as_slice(), &mut output, &IdentityScorer)
            .await
            .unwrap();

        assert_eq!(frames, 0);
        assert!(output.into_inner().is_empty());
    }

    #[tokio::test]
    async fn test_truncated_frame_is_an_error() {
        let meta = meta_32();
        let mut input = solid_frame_bytes(1);
        input.truncate(input.len() - 7);

        let mut output = Cursor::new(Vec::new());
        let err = copy_styled(&meta, input.as_slice(), &mut output, &IdentityScorer)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::DecodeFailed { .. }));
    }

    #[tokio::test]
    async fn test_inference_error_aborts() {
        let meta = meta_32();
        let input = solid_frame_bytes(1);

        let mut output = Cursor::new(Vec::new());
        let err = copy_styled(&meta, input.as_slice(), &mut output, &FailingScorer)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Inference(_)));
    }
}
