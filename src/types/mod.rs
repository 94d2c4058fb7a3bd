//! Type definitions for the price prediction service

pub mod quote;
pub mod request;

pub use quote::PriceQuote;
pub use request::{PredictionRequest, Quantity};
