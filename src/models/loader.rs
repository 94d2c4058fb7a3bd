//! ONNX model loader

use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;
use tracing::{debug, info};

/// Loaded ONNX model with metadata
pub struct LoadedModel {
    /// Model name
    pub name: String,
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the model
    pub input_name: String,
    /// Output name read after a run
    pub output_name: String,
}

impl LoadedModel {
    /// Run the model on one `f32` tensor and return the output's shape and values
    pub fn run_f32(&mut self, shape: Vec<i64>, data: Vec<f32>) -> Result<(Vec<i64>, Vec<f32>)> {
        let input_tensor = Tensor::from_array((shape, data))
            .with_context(|| format!("Failed to create input tensor for {}", self.name))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .with_context(|| format!("Inference failed for {}", self.name))?;

        let output = outputs.get(self.output_name.as_str()).with_context(|| {
            format!("Model {} produced no output {:?}", self.name, self.output_name)
        })?;

        let (shape, values) = output
            .try_extract_tensor::<f32>()
            .with_context(|| format!("Output of {} is not an f32 tensor", self.name))?;
        let dims: Vec<i64> = shape.iter().copied().collect();

        debug!(model = %self.name, shape = ?dims, "Model run complete");
        Ok((dims, values.to_vec()))
    }
}

/// Loader for ONNX models
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        // Initialize ONNX Runtime
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load a single ONNX model from file. A missing file is an error.
    pub fn load_model<P: AsRef<Path>>(&self, path: P, name: &str) -> Result<LoadedModel> {
        let path = path.as_ref();
        if !path.is_file() {
            anyhow::bail!("Model file for {} not found at {}", name, path.display());
        }

        info!(model = %name, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .with_context(|| format!("Model {} declares no inputs", name))?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .with_context(|| format!("Model {} declares no outputs", name))?;

        info!(
            model = %name,
            input = %input_name,
            output = %output_name,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            name: name.to_string(),
            session,
            input_name,
            output_name,
        })
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self { onnx_threads: 1 }
    }
}
