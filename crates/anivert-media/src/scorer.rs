//! The frame scoring boundary.
//!
//! `FrameScorer` is the seam between the pipeline and the style transfer
//! model: a normalized frame tensor in, a stylized tensor of the same
//! shape out. The production implementation wraps an ONNX Runtime
//! session loaded once at process startup; tests substitute their own
//! scorers.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

/// Scores one normalized frame at a time.
///
/// Input and output are NHWC `[1, h, w, 3]` tensors with values in
/// `[-1.0, 1.0]`. Implementations must be shareable across conversions.
pub trait FrameScorer: Send + Sync {
    fn score(&self, input: Array4<f32>) -> MediaResult<Array4<f32>>;
}

/// Frame scorer backed by a pretrained ONNX style transfer model.
#[derive(Debug)]
pub struct OnnxScorer {
    session: Mutex<Session>,
    output_name: String,
}

impl OnnxScorer {
    /// Load the model from disk.
    ///
    /// Returns an error if the model file doesn't exist or cannot be
    /// loaded. The session is created once and reused for every frame of
    /// every conversion.
    pub fn load(model_path: impl AsRef<Path>) -> MediaResult<Self> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(MediaError::model_not_found(model_path.display().to_string()));
        }

        let session = create_session(model_path)?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| MediaError::inference("Model declares no outputs"))?;

        info!(
            model_path = %model_path.display(),
            output = %output_name,
            "Style transfer model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            output_name,
        })
    }
}

impl FrameScorer for OnnxScorer {
    fn score(&self, input: Array4<f32>) -> MediaResult<Array4<f32>> {
        let (batch, h, w, channels) = input.dim();

        let shape = vec![batch, h, w, channels];
        let data = input.into_raw_vec();
        let value: Value = Tensor::from_array((shape, data.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| MediaError::inference(format!("Failed to create input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| MediaError::inference("Session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![value])
            .map_err(|e| MediaError::inference(format!("ONNX inference failed: {}", e)))?;

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| MediaError::inference("Model returned no outputs"))?;

        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| MediaError::inference(format!("Failed to extract output tensor: {}", e)))?;

        let data: Vec<f32> = tensor.1.to_vec();

        // The model preserves spatial shape, so the input dimensions size
        // the output array.
        let expected = batch * h * w * channels;
        if data.len() != expected {
            return Err(MediaError::inference(format!(
                "Unexpected output length: expected {}, got {}",
                expected,
                data.len()
            )));
        }

        Array4::from_shape_vec((batch, h, w, channels), data)
            .map_err(|e| MediaError::inference(format!("Failed to shape output tensor: {}", e)))
    }
}

/// Create an ONNX Runtime session with automatic execution provider selection.
fn create_session(model_path: &Path) -> MediaResult<Session> {
    let model_bytes = std::fs::read(model_path)
        .map_err(|e| MediaError::inference(format!("Failed to read model file: {}", e)))?;

    let builder = Session::builder()
        .map_err(|e| MediaError::inference(format!("Failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| MediaError::inference(format!("Failed to set optimization level: {}", e)))?;

    // Try CUDA on Linux with cuda feature
    #[cfg(all(target_os = "linux", feature = "cuda"))]
    {
        use ort::execution_providers::CUDAExecutionProvider;
        if let Ok(cuda_builder) = builder
            .clone()
            .with_execution_providers([CUDAExecutionProvider::default().build()])
        {
            if let Ok(session) = cuda_builder.commit_from_memory(&model_bytes) {
                info!("Using CUDA execution provider for style transfer");
                return Ok(session);
            }
        }
        debug!("CUDA execution provider not available, falling back to CPU");
    }

    debug!("Using CPU execution provider for style transfer");
    builder
        .commit_from_memory(&model_bytes)
        .map_err(|e| MediaError::inference(format!("Failed to load ONNX model: {}", e)))
}
