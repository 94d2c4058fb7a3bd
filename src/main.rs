//! Product Price Predictor - Main Entry Point
//!
//! Loads the model artifacts once, then serves the upload form and
//! `/predict` over HTTP until interrupted.

use anyhow::Result;
use price_predictor::{
    config::AppConfig,
    metrics::{MetricsReporter, ServiceMetrics},
    pipeline::PricePredictor,
    server::{self, AppState},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("price_predictor={}", config.logging.level).parse()?);
    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting Product Price Predictor");
    info!(
        "Configuration loaded: port={}, workers={}, upload limit={} bytes",
        config.server.port, config.pipeline.workers, config.server.max_upload_bytes
    );

    // Load models; any failure here is fatal
    info!("Loading models...");
    let predictor = Arc::new(PricePredictor::from_config(&config)?);
    info!(
        "Models loaded, feature row width {}",
        predictor.feature_width()
    );

    // Initialize metrics
    let metrics = Arc::new(ServiceMetrics::new());
    if config.pipeline.metrics_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.metrics_interval_secs);
        tokio::spawn(reporter.start());
    }

    let state = AppState::new(predictor, metrics.clone(), &config);
    server::serve(&config, state).await?;

    // Print final summary
    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}
