//! Prediction request data structures

use crate::error::{PredictError, PredictResult};
use std::fmt;

/// Number of units being priced, always at least 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity(u32);

impl Quantity {
    /// Create a quantity, rejecting zero
    pub fn new(value: u32) -> PredictResult<Self> {
        if value == 0 {
            return Err(PredictError::InvalidQuantity(value.to_string()));
        }
        Ok(Self(value))
    }

    /// Parse a form value such as `"3"`.
    ///
    /// Surrounding whitespace is ignored. Signs, decimals, exponents and
    /// values beyond `u32::MAX` are rejected.
    pub fn parse(raw: &str) -> PredictResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PredictError::InvalidQuantity(raw.to_string()));
        }
        let value: u32 = trimmed
            .parse()
            .map_err(|_| PredictError::InvalidQuantity(raw.to_string()))?;
        Self::new(value)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self(1)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated prediction request
#[derive(Debug, Clone)]
pub struct PredictionRequest {
    /// Raw uploaded image bytes, any container format
    pub image: Vec<u8>,
    /// Free-form product description, possibly empty
    pub description: String,
    /// Number of units
    pub quantity: Quantity,
}

impl PredictionRequest {
    pub fn new(image: Vec<u8>, description: impl Into<String>, quantity: Quantity) -> Self {
        Self {
            image,
            description: description.into(),
            quantity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_quantities() {
        assert_eq!(Quantity::parse("1").unwrap().get(), 1);
        assert_eq!(Quantity::parse(" 3 ").unwrap().get(), 3);
        assert_eq!(Quantity::parse("100").unwrap().get(), 100);
    }

    #[test]
    fn test_parse_rejects_invalid_quantities() {
        for raw in ["", "0", "-1", "+2", "2.5", "1e3", "abc", "99999999999"] {
            let err = Quantity::parse(raw).unwrap_err();
            assert!(
                matches!(err, PredictError::InvalidQuantity(_)),
                "expected invalid quantity for {raw:?}"
            );
        }
    }

    #[test]
    fn test_zero_rejected() {
        assert!(Quantity::new(0).is_err());
        assert_eq!(Quantity::default().get(), 1);
    }
}
