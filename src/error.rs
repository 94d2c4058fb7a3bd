//! Request-facing error taxonomy

use crate::render;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;

pub type PredictResult<T> = Result<T, PredictError>;

/// Errors a single prediction request can end with.
///
/// Everything except [`PredictError::Inference`] is caused by the caller's
/// input. Start-up failures are not represented here; they abort the process.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("no image was uploaded")]
    MissingImage,
    #[error("unsupported image format: {0}")]
    UnsupportedImageFormat(String),
    #[error("image could not be decoded: {0}")]
    MalformedImage(String),
    #[error("quantity must be a positive whole number, got {0:?}")]
    InvalidQuantity(String),
    #[error("malformed form submission: {0}")]
    MalformedForm(String),
    #[error("upload is larger than the {0} byte limit")]
    PayloadTooLarge(usize),
    #[error("inference failed: {0}")]
    Inference(#[from] anyhow::Error),
}

impl PredictError {
    /// Whether the error was caused by the request rather than the service
    pub fn is_client_error(&self) -> bool {
        !matches!(self, PredictError::Inference(_))
    }

    /// Short stable label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::MissingImage => "missing_image",
            PredictError::UnsupportedImageFormat(_) => "unsupported_image_format",
            PredictError::MalformedImage(_) => "malformed_image",
            PredictError::InvalidQuantity(_) => "invalid_quantity",
            PredictError::MalformedForm(_) => "malformed_form",
            PredictError::PayloadTooLarge(_) => "payload_too_large",
            PredictError::Inference(_) => "inference",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PredictError::UnsupportedImageFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            PredictError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            PredictError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PredictError::MissingImage
            | PredictError::MalformedImage(_)
            | PredictError::InvalidQuantity(_)
            | PredictError::MalformedForm(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show to the caller. Inference details stay in the log.
    pub fn public_message(&self) -> String {
        match self {
            PredictError::Inference(_) => {
                "The price could not be predicted due to an internal error. Please try again."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let title = if self.is_client_error() {
            "Invalid input"
        } else {
            "Prediction failed"
        };
        let page = render::error_page(status.as_u16(), title, &self.public_message());
        (status, Html(page)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        assert!(PredictError::MissingImage.is_client_error());
        assert!(PredictError::InvalidQuantity("0".into()).is_client_error());
        assert!(PredictError::MalformedImage("eof".into()).is_client_error());
        assert!(!PredictError::Inference(anyhow::anyhow!("boom")).is_client_error());
    }

    #[test]
    fn test_inference_details_hidden() {
        let err = PredictError::Inference(anyhow::anyhow!("session poisoned"));
        assert!(!err.public_message().contains("poisoned"));
        assert_eq!(err.kind(), "inference");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(PredictError::MissingImage.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            PredictError::InvalidQuantity("abc".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PredictError::UnsupportedImageFormat("unknown".into()).status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            PredictError::PayloadTooLarge(1024).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            PredictError::Inference(anyhow::anyhow!("x")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_response_is_html() {
        let response = PredictError::MalformedImage("<eof>".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let content_type = response.headers()[axum::http::header::CONTENT_TYPE]
            .to_str()
            .unwrap();
        assert!(content_type.starts_with("text/html"));
    }
}
