//! Pretrained ResNet50 feature network (ONNX, global average pooled)

use crate::features::ImageEmbedding;
use crate::models::loader::{LoadedModel, ModelLoader};
use crate::models::ImageEmbedder;
use crate::vision::preprocess::PreparedImage;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::RwLock;
use tracing::debug;

/// Image feature extractor backed by an ONNX export of ResNet50
/// without its classification head.
pub struct OnnxImageEmbedder {
    model: RwLock<LoadedModel>,
}

impl OnnxImageEmbedder {
    pub fn load<P: AsRef<Path>>(loader: &ModelLoader, path: P) -> Result<Self> {
        let model = loader.load_model(path, "resnet50")?;
        Ok(Self {
            model: RwLock::new(model),
        })
    }
}

impl ImageEmbedder for OnnxImageEmbedder {
    fn embed(&self, image: &PreparedImage) -> Result<ImageEmbedding> {
        let (dims, values) = {
            let mut model = self
                .model
                .write()
                .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
            model.run_f32(image.shape().to_vec(), image.data().to_vec())?
        };

        debug!(output_shape = ?dims, "Image features extracted");
        ImageEmbedding::new(values)
            .with_context(|| format!("Unexpected image network output shape {:?}", dims))
    }
}
