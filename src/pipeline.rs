//! Price inference pipeline

use crate::config::AppConfig;
use crate::error::{PredictError, PredictResult};
use crate::features::FeatureRow;
use crate::models::ModelArtifacts;
use crate::text::TextNormalizer;
use crate::types::{PredictionRequest, PriceQuote};
use crate::vision::ImagePreprocessor;
use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

/// Time spent in each pipeline stage
#[derive(Debug, Clone, Copy, Default)]
pub struct StageTimings {
    /// Normalization and vectorization
    pub text: Duration,
    /// Decode, resize and feature network
    pub image: Duration,
    /// Price model
    pub regression: Duration,
}

impl StageTimings {
    pub fn total(&self) -> Duration {
        self.text + self.image + self.regression
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone)]
pub struct Prediction {
    pub quote: PriceQuote,
    /// Width of the feature row sent to the price model
    pub feature_width: usize,
    pub timings: StageTimings,
}

/// Turns (image, description, quantity) into a price quote
pub struct PricePredictor {
    artifacts: ModelArtifacts,
    normalizer: TextNormalizer,
    preprocessor: ImagePreprocessor,
}

impl PricePredictor {
    /// Create a predictor over already loaded artifacts
    pub fn new(artifacts: ModelArtifacts, preprocessor: ImagePreprocessor) -> Self {
        Self {
            artifacts,
            normalizer: TextNormalizer::new(),
            preprocessor,
        }
    }

    /// Load and verify all artifacts from configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let preprocessor = ImagePreprocessor::new(
            config.models.image_layout,
            config.models.image_preprocessing,
        );
        let artifacts = ModelArtifacts::load(&config.models)?;
        artifacts
            .verify(&preprocessor)
            .context("Model artifacts are incompatible")?;

        info!(
            feature_width = artifacts.feature_width(),
            layout = ?config.models.image_layout,
            preprocessing = ?config.models.image_preprocessing,
            "Price predictor ready"
        );
        Ok(Self::new(artifacts, preprocessor))
    }

    /// Width of every feature row this predictor builds
    pub fn feature_width(&self) -> usize {
        self.artifacts.feature_width()
    }

    /// Run the full pipeline for one request.
    ///
    /// Client input problems (image) come back as the matching
    /// [`PredictError`] variant; anything failing inside the models is
    /// [`PredictError::Inference`].
    pub fn predict(&self, request_id: Uuid, request: &PredictionRequest) -> PredictResult<Prediction> {
        let mut timings = StageTimings::default();

        let started = Instant::now();
        let normalized = self.normalizer.normalize(&request.description);
        let text_features = self
            .artifacts
            .vectorizer
            .transform(&normalized)
            .context("Text vectorization failed")?;
        timings.text = started.elapsed();

        let started = Instant::now();
        let prepared = self.preprocessor.prepare(&request.image)?;
        let image_features = self
            .artifacts
            .embedder
            .embed(&prepared)
            .context("Image feature extraction failed")?;
        timings.image = started.elapsed();

        let row = FeatureRow::new(text_features, image_features);
        let feature_width = row.len();
        if feature_width != self.feature_width() {
            return Err(PredictError::Inference(anyhow::anyhow!(
                "feature row has width {}, price model expects {}",
                feature_width,
                self.feature_width()
            )));
        }

        let started = Instant::now();
        let log_price = self
            .artifacts
            .regressor
            .predict_log_price(&row)
            .context("Price model inference failed")?;
        timings.regression = started.elapsed();

        if !log_price.is_finite() {
            return Err(PredictError::Inference(anyhow::anyhow!(
                "price model returned a non-finite value: {}",
                log_price
            )));
        }

        let quote = PriceQuote::from_log_price(request_id, log_price, request.quantity, normalized);

        debug!(
            request_id = %request_id,
            log_price = log_price,
            price_per_unit = quote.price_per_unit,
            text_nnz = row.text().nnz(),
            feature_width = feature_width,
            "Prediction complete"
        );

        Ok(Prediction {
            quote,
            feature_width,
            timings,
        })
    }
}
