//! Price quote returned by the inference pipeline

use crate::types::request::Quantity;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Lowest price per unit the service will ever quote
pub const MIN_UNIT_PRICE: f64 = 1.0;

/// Convert a `log(1 + price)` prediction back to a price per unit.
///
/// The result is never below [`MIN_UNIT_PRICE`].
pub fn unit_price_from_log(log_price: f64) -> f64 {
    log_price.exp_m1().max(MIN_UNIT_PRICE)
}

/// Structured prediction result, independent of presentation
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    /// Request identifier, also used in logs
    pub request_id: Uuid,
    /// Raw regression output on the log scale
    pub log_price: f64,
    /// Predicted price per unit (>= 1.0)
    pub price_per_unit: f64,
    /// Number of units priced
    pub quantity: Quantity,
    /// `price_per_unit * quantity`
    pub total: f64,
    /// Description after normalization, as seen by the vectorizer
    pub normalized_description: String,
    /// Quote generation timestamp
    pub predicted_at: DateTime<Utc>,
}

impl PriceQuote {
    /// Build a quote from a raw log-price prediction
    pub fn from_log_price(
        request_id: Uuid,
        log_price: f64,
        quantity: Quantity,
        normalized_description: String,
    ) -> Self {
        let price_per_unit = unit_price_from_log(log_price);
        Self {
            request_id,
            log_price,
            price_per_unit,
            quantity,
            total: price_per_unit * f64::from(quantity.get()),
            normalized_description,
            predicted_at: Utc::now(),
        }
    }
}
