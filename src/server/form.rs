//! Multipart form decoding for `/predict`

use crate::error::{PredictError, PredictResult};
use crate::types::{PredictionRequest, Quantity};
use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use tracing::debug;

/// Read the `image`, `quantity` and `description` fields.
///
/// Unknown fields are skipped. A repeated field keeps its last value. An
/// empty file part counts as no image, which is what browsers send when the
/// file input is left blank.
pub async fn read_prediction_form(
    mut multipart: Multipart,
    upload_limit: usize,
) -> PredictResult<PredictionRequest> {
    let mut image: Option<Vec<u8>> = None;
    let mut quantity: Option<String> = None;
    let mut description = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| form_error(e, upload_limit))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let bytes = field.bytes().await.map_err(|e| form_error(e, upload_limit))?;
                image = (!bytes.is_empty()).then(|| bytes.to_vec());
            }
            "quantity" => {
                let bytes = field.bytes().await.map_err(|e| form_error(e, upload_limit))?;
                quantity = Some(String::from_utf8_lossy(&bytes).into_owned());
            }
            "description" => {
                let bytes = field.bytes().await.map_err(|e| form_error(e, upload_limit))?;
                description = String::from_utf8_lossy(&bytes).into_owned();
            }
            other => {
                debug!(field = other, "Ignoring unknown form field");
            }
        }
    }

    let image = image.ok_or(PredictError::MissingImage)?;
    let quantity = match quantity {
        Some(raw) => Quantity::parse(&raw)?,
        None => return Err(PredictError::InvalidQuantity(String::new())),
    };

    Ok(PredictionRequest::new(image, description, quantity))
}

fn form_error(err: MultipartError, upload_limit: usize) -> PredictError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        PredictError::PayloadTooLarge(upload_limit)
    } else {
        PredictError::MalformedForm(err.body_text())
    }
}
