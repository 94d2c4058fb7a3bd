//! Model artifacts and the seams the inference pipeline calls through

pub mod artifacts;
pub mod loader;
pub mod regressor;

pub use artifacts::ModelArtifacts;
pub use loader::ModelLoader;
pub use regressor::OnnxPriceRegressor;

use crate::features::{FeatureRow, ImageEmbedding, SparseVector};
use crate::vision::PreparedImage;
use anyhow::Result;

/// Maps normalized text to a fixed-width sparse vector
pub trait TextVectorizer: Send + Sync {
    /// Width of every vector this vectorizer produces
    fn dimension(&self) -> usize;

    /// Vectorize one normalized description; empty text gives the zero vector
    fn transform(&self, text: &str) -> Result<SparseVector>;
}

/// Maps a prepared image tensor to a 2048-wide embedding
pub trait ImageEmbedder: Send + Sync {
    fn embed(&self, image: &PreparedImage) -> Result<ImageEmbedding>;
}

/// Maps a feature row to a `log(1 + price)` prediction
pub trait PriceRegressor: Send + Sync {
    fn predict_log_price(&self, row: &FeatureRow) -> Result<f64>;
}
