//! Process-wide, read-only model artifacts

use crate::config::ModelsConfig;
use crate::features::{FeatureRow, SparseVector, IMAGE_EMBEDDING_DIM};
use crate::models::loader::ModelLoader;
use crate::models::regressor::OnnxPriceRegressor;
use crate::models::{ImageEmbedder, PriceRegressor, TextVectorizer};
use crate::text::TfidfVectorizer;
use crate::vision::{ImagePreprocessor, OnnxImageEmbedder, INPUT_SIZE};
use anyhow::{Context, Result};
use image::RgbImage;
use std::sync::Arc;
use tracing::info;

/// The three pretrained artifacts every request is served from.
///
/// Loaded once at start-up and shared behind `Arc`; nothing here is ever
/// mutated or reloaded.
#[derive(Clone)]
pub struct ModelArtifacts {
    pub vectorizer: Arc<dyn TextVectorizer>,
    pub embedder: Arc<dyn ImageEmbedder>,
    pub regressor: Arc<dyn PriceRegressor>,
}

impl ModelArtifacts {
    /// Assemble artifacts from already constructed components
    pub fn new(
        vectorizer: Arc<dyn TextVectorizer>,
        embedder: Arc<dyn ImageEmbedder>,
        regressor: Arc<dyn PriceRegressor>,
    ) -> Self {
        Self {
            vectorizer,
            embedder,
            regressor,
        }
    }

    /// Load every artifact from the configured paths
    pub fn load(config: &ModelsConfig) -> Result<Self> {
        info!(models_dir = %config.models_dir, "Loading model artifacts");

        let vectorizer = TfidfVectorizer::load(config.vectorizer_path())
            .context("Failed to load text vectorizer")?;

        let loader = ModelLoader::with_threads(config.onnx_threads)?;
        let embedder = OnnxImageEmbedder::load(&loader, config.image_model_path())
            .context("Failed to load image feature network")?;
        let regressor = OnnxPriceRegressor::load(&loader, config.price_model_path())
            .context("Failed to load price model")?;

        Ok(Self::new(
            Arc::new(vectorizer),
            Arc::new(embedder),
            Arc::new(regressor),
        ))
    }

    /// Width of the rows fed to the regressor
    pub fn feature_width(&self) -> usize {
        self.vectorizer.dimension() + IMAGE_EMBEDDING_DIM
    }

    /// Run a warm-up probe through both networks.
    ///
    /// An all-black image must produce a full-width embedding and a zero
    /// feature row must produce a finite prediction; anything else means
    /// the artifacts do not fit together.
    pub fn verify(&self, preprocessor: &ImagePreprocessor) -> Result<()> {
        let probe = preprocessor.prepare_rgb(&RgbImage::new(INPUT_SIZE, INPUT_SIZE));
        let embedding = self
            .embedder
            .embed(&probe)
            .context("Image feature network failed the warm-up probe")?;

        let row = FeatureRow::new(SparseVector::zeros(self.vectorizer.dimension()), embedding);
        let width = row.len();
        let log_price = self
            .regressor
            .predict_log_price(&row)
            .with_context(|| {
                format!(
                    "Price model rejected a feature row of width {} ({} text + {} image)",
                    width,
                    self.vectorizer.dimension(),
                    IMAGE_EMBEDDING_DIM
                )
            })?;

        if !log_price.is_finite() {
            anyhow::bail!("Price model produced a non-finite warm-up prediction: {}", log_price);
        }

        info!(
            feature_width = width,
            text_width = self.vectorizer.dimension(),
            "Model artifacts verified"
        );
        Ok(())
    }
}
