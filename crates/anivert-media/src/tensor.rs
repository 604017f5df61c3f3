//! Normalize/denormalize transforms between decoded pixels and model tensors.
//!
//! The model requires input dimensions divisible by 32, so frames are
//! cropped down by truncation before scoring and the model output is
//! resized (interpolated) back to the original geometry. Output videos
//! therefore always keep the source dimensions.
//!
//! Frames arrive as RGB24 straight from the rawvideo pipe, which is also
//! the channel order the model consumes, so no channel swap is needed.

use image::{imageops::FilterType, ImageBuffer, Rgb};
use ndarray::Array4;

use crate::error::{MediaError, MediaResult};
use crate::scorer::FrameScorer;

/// Input dimension granularity required by the model.
pub const MODEL_GRANULARITY: u32 = 32;

/// A single decoded video frame in RGB24 layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Raw pixel data, `width * height * 3` bytes
    pub data: Vec<u8>,
}

impl Frame {
    /// Create a frame, validating the buffer length.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> MediaResult<Self> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(MediaError::internal(format!(
                "Invalid frame buffer length: expected {}, got {}",
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }
}

/// Dimensions after truncating down to the model granularity.
///
/// Returns `None` when either dimension is below the granularity, in
/// which case the frame cannot be scored at all.
pub fn model_dims(width: u32, height: u32) -> Option<(u32, u32)> {
    let w = width - width % MODEL_GRANULARITY;
    let h = height - height % MODEL_GRANULARITY;
    if w == 0 || h == 0 {
        None
    } else {
        Some((w, h))
    }
}

/// Normalize a frame into the model's input tensor.
///
/// Crops width and height down to the nearest multiple of 32 (truncation,
/// not resize) and maps pixel values from `[0,255]` to `[-1.0, 1.0]`.
/// The result is NHWC: `[1, h, w, 3]`.
pub fn normalize(frame: &Frame) -> MediaResult<Array4<f32>> {
    let (w, h) = model_dims(frame.width, frame.height).ok_or_else(|| {
        MediaError::InvalidVideo(format!(
            "Frame {}x{} is smaller than the model granularity of {}px",
            frame.width, frame.height, MODEL_GRANULARITY
        ))
    })?;

    let src_stride = frame.width as usize * 3;
    let row_len = w as usize * 3;

    let mut data = Vec::with_capacity(h as usize * row_len);
    for y in 0..h as usize {
        let row = &frame.data[y * src_stride..y * src_stride + row_len];
        data.extend(row.iter().map(|&v| v as f32 / 127.5 - 1.0));
    }

    Array4::from_shape_vec((1, h as usize, w as usize, 3), data)
        .map_err(|e| MediaError::internal(format!("Failed to shape input tensor: {}", e)))
}

/// Denormalize a model output tensor back into a frame.
///
/// Maps `[-1.0, 1.0]` back to `[0,255]` with rounding and clipping, then
/// resizes (interpolated) up to the original `width` x `height` so output
/// geometry is stable regardless of the crop-to-32 step.
pub fn denormalize(tensor: &Array4<f32>, width: u32, height: u32) -> MediaResult<Frame> {
    let (batch, h, w, channels) = tensor.dim();
    if batch != 1 || channels != 3 {
        return Err(MediaError::inference(format!(
            "Unexpected output tensor shape: [{}, {}, {}, {}]",
            batch, h, w, channels
        )));
    }

    let pixels: Vec<u8> = tensor
        .iter()
        .map(|&v| ((v + 1.0) / 2.0 * 255.0).round().clamp(0.0, 255.0) as u8)
        .collect();

    let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_raw(w as u32, h as u32, pixels)
            .ok_or_else(|| MediaError::internal("Failed to build output image buffer"))?;

    let data = if (w as u32, h as u32) == (width, height) {
        buffer.into_raw()
    } else {
        image::imageops::resize(&buffer, width, height, FilterType::Triangle).into_raw()
    };

    Frame::new(width, height, data)
}

/// Run one frame through the scorer: normalize, score, denormalize.
///
/// The output frame always has the same dimensions as the input frame.
pub fn stylize_frame(scorer: &dyn FrameScorer, frame: &Frame) -> MediaResult<Frame> {
    let input = normalize(frame)?;
    let output = scorer.score(input)?;
    denormalize(&output, frame.width, frame.height)
}
