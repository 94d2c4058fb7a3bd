//! Shared fixtures for the HTTP tests

#![allow(dead_code)]

use axum::Router;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use price_predictor::config::AppConfig;
use price_predictor::features::{FeatureRow, ImageEmbedding, IMAGE_EMBEDDING_DIM};
use price_predictor::metrics::ServiceMetrics;
use price_predictor::models::{ImageEmbedder, ModelArtifacts, PriceRegressor};
use price_predictor::pipeline::PricePredictor;
use price_predictor::server::{build_router, AppState};
use price_predictor::text::TfidfVectorizer;
use price_predictor::vision::{ImagePreprocessor, PreparedImage};
use std::io::Cursor;
use std::sync::Arc;

pub const BOUNDARY: &str = "price-predictor-test-boundary";

pub struct ConstEmbedder;

impl ImageEmbedder for ConstEmbedder {
    fn embed(&self, _image: &PreparedImage) -> anyhow::Result<ImageEmbedding> {
        ImageEmbedding::new(vec![0.1; IMAGE_EMBEDDING_DIM])
    }
}

pub struct ConstRegressor(pub f64);

impl PriceRegressor for ConstRegressor {
    fn predict_log_price(&self, _row: &FeatureRow) -> anyhow::Result<f64> {
        Ok(self.0)
    }
}

pub struct FailingRegressor;

impl PriceRegressor for FailingRegressor {
    fn predict_log_price(&self, _row: &FeatureRow) -> anyhow::Result<f64> {
        anyhow::bail!("onnx session returned status 6: secret internal detail")
    }
}

pub struct TestApp {
    pub router: Router,
    pub metrics: Arc<ServiceMetrics>,
}

pub fn app_with(regressor: Arc<dyn PriceRegressor>, max_upload_bytes: usize) -> TestApp {
    let vectorizer = TfidfVectorizer::from_json(
        r#"{"vocabulary": {"brand": 0, "new": 1, "iphone": 2, "14": 3}, "idf": [1.0, 1.0, 2.0, 2.0]}"#,
    )
    .unwrap();
    let artifacts = ModelArtifacts::new(Arc::new(vectorizer), Arc::new(ConstEmbedder), regressor);
    let predictor = Arc::new(PricePredictor::new(artifacts, ImagePreprocessor::default()));

    let mut config = AppConfig::default();
    config.server.max_upload_bytes = max_upload_bytes;
    config.pipeline.workers = 2;

    let metrics = Arc::new(ServiceMetrics::new());
    let state = AppState::new(predictor, metrics.clone(), &config);
    TestApp {
        router: build_router(state, &config.server),
        metrics,
    }
}

/// App whose price model always predicts `log_price`
pub fn app(log_price: f64) -> TestApp {
    app_with(Arc::new(ConstRegressor(log_price)), 10 * 1024 * 1024)
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 120, 40])))
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// A form field: (name, optional file name, content)
pub type Field<'a> = (&'a str, Option<&'a str>, &'a [u8]);

pub fn multipart_body(fields: &[Field<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file_name, content) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match file_name {
            Some(file_name) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
            }
        }
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}
