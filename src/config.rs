//! Configuration management for the price prediction service

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the optional configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Memory layout of the image network's input tensor
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// `[1, 224, 224, 3]` - Keras / tf2onnx exports
    #[default]
    Nhwc,
    /// `[1, 3, 224, 224]` - PyTorch exports
    Nchw,
}

/// Pixel preprocessing expected by the image network
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PixelPreprocessing {
    /// BGR channel order, ImageNet mean subtracted, no scaling (Keras ResNet50)
    #[default]
    Caffe,
    /// RGB scaled to [0, 1] then normalized with ImageNet mean/std
    Torch,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// TCP port, overridden by the `PORT` environment variable
    pub port: u16,
    /// Maximum accepted request body size in bytes
    pub max_upload_bytes: usize,
    /// Allow cross-origin requests from any origin
    pub cors_allow_any: bool,
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Directory containing the model artifacts
    pub models_dir: String,
    /// Regression model file (ONNX), relative to `models_dir`
    pub price_model: String,
    /// Text vectorizer export (JSON), relative to `models_dir`
    pub vectorizer: String,
    /// Image feature network file (ONNX), relative to `models_dir`
    pub image_model: String,
    /// Number of threads for ONNX inference per session
    pub onnx_threads: usize,
    /// Input layout of the image network
    pub image_layout: TensorLayout,
    /// Pixel preprocessing of the image network
    pub image_preprocessing: PixelPreprocessing,
}

impl ModelsConfig {
    pub fn price_model_path(&self) -> PathBuf {
        Path::new(&self.models_dir).join(&self.price_model)
    }

    pub fn vectorizer_path(&self) -> PathBuf {
        Path::new(&self.models_dir).join(&self.vectorizer)
    }

    pub fn image_model_path(&self) -> PathBuf {
        Path::new(&self.models_dir).join(&self.image_model)
    }
}

/// Request pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum number of concurrently running inferences
    pub workers: usize,
    /// Interval between metrics summaries in seconds (0 disables the reporter)
    pub metrics_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from the default file, environment and `PORT`
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path.
    ///
    /// Later sources win: built-in defaults, the file (optional),
    /// `PRICE_PREDICTOR__SECTION__KEY` variables, then `PORT`.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("PRICE_PREDICTOR")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .set_override_option("server.port", std::env::var("PORT").ok())
            .context("Failed to apply PORT override")?
            .build()
            .context("Failed to build configuration")?;

        let app: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        app.validate()?;
        Ok(app)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.workers == 0 {
            anyhow::bail!("pipeline.workers must be at least 1");
        }
        if self.models.onnx_threads == 0 {
            anyhow::bail!("models.onnx_threads must be at least 1");
        }
        if self.server.max_upload_bytes == 0 {
            anyhow::bail!("server.max_upload_bytes must be positive");
        }
        Ok(())
    }

    /// Socket address string the server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            models: ModelsConfig::default(),
            pipeline: PipelineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10000,
            max_upload_bytes: 10 * 1024 * 1024,
            cors_allow_any: true,
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            models_dir: "models".to_string(),
            price_model: "price_model.onnx".to_string(),
            vectorizer: "vectorizer.json".to_string(),
            image_model: "resnet50.onnx".to_string(),
            onnx_threads: 1,
            image_layout: TensorLayout::Nhwc,
            image_preprocessing: PixelPreprocessing::Caffe,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            metrics_interval_secs: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
