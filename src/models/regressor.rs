//! ONNX price regression model

use crate::features::FeatureRow;
use crate::models::loader::{LoadedModel, ModelLoader};
use crate::models::PriceRegressor;
use anyhow::Result;
use std::path::Path;
use std::sync::RwLock;
use tracing::debug;

/// Regression model predicting `log(1 + price)` from a dense feature row
pub struct OnnxPriceRegressor {
    /// Session needs exclusive access while running
    model: RwLock<LoadedModel>,
}

impl OnnxPriceRegressor {
    pub fn load<P: AsRef<Path>>(loader: &ModelLoader, path: P) -> Result<Self> {
        let model = loader.load_model(path, "price_model")?;
        Ok(Self {
            model: RwLock::new(model),
        })
    }
}

impl PriceRegressor for OnnxPriceRegressor {
    fn predict_log_price(&self, row: &FeatureRow) -> Result<f64> {
        let shape = vec![1_i64, row.len() as i64];

        let (_, values) = {
            let mut model = self
                .model
                .write()
                .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
            model.run_f32(shape, row.to_dense())?
        };

        // Regressors export either [1] or [1, 1]; both flatten to one value.
        let log_price = values
            .first()
            .copied()
            .ok_or_else(|| anyhow::anyhow!("price model returned an empty output"))?;

        debug!(log_price = log_price, width = row.len(), "Price model inference complete");
        Ok(f64::from(log_price))
    }
}
