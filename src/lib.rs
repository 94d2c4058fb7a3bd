//! Product Price Predictor Library
//!
//! Predicts a product's price from a photo and a short description:
//! ResNet50 image features and TF-IDF text features feed a regression
//! model trained on `log(1 + price)`, served over a small HTML front end.

pub mod config;
pub mod error;
pub mod features;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod render;
pub mod server;
pub mod text;
pub mod types;
pub mod vision;

pub use config::AppConfig;
pub use error::{PredictError, PredictResult};
pub use models::ModelArtifacts;
pub use pipeline::{Prediction, PricePredictor};
pub use types::{PredictionRequest, PriceQuote, Quantity};
