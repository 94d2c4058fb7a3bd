//! Request handlers

use crate::error::{PredictError, PredictResult};
use crate::pipeline::Prediction;
use crate::render;
use crate::server::form::read_prediction_form;
use crate::server::AppState;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::response::{Html, IntoResponse, Response};
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

/// `GET /`
pub async fn index() -> Html<&'static str> {
    Html(render::index_page())
}

/// `POST /predict`
pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let request_id = Uuid::new_v4();
    let started = Instant::now();

    match run_prediction(&state, request_id, multipart).await {
        Ok(prediction) => {
            let quote = &prediction.quote;
            let timings = prediction.timings;
            state.metrics.record_stage_time("text", timings.text);
            state.metrics.record_stage_time("image", timings.image);
            state.metrics.record_stage_time("regression", timings.regression);
            state
                .metrics
                .record_prediction(timings.total(), quote.price_per_unit);

            info!(
                request_id = %request_id,
                price_per_unit = quote.price_per_unit,
                quantity = quote.quantity.get(),
                total = quote.total,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Price predicted"
            );
            Html(render::result_page(quote)).into_response()
        }
        Err(err) => {
            if err.is_client_error() {
                state.metrics.record_client_error(err.kind());
                warn!(request_id = %request_id, kind = err.kind(), "Rejected request: {}", err);
            } else {
                state.metrics.record_inference_failure();
                error!(request_id = %request_id, "Prediction failed: {:#}", err);
            }
            err.into_response()
        }
    }
}

async fn run_prediction(
    state: &AppState,
    request_id: Uuid,
    multipart: Result<Multipart, MultipartRejection>,
) -> PredictResult<Prediction> {
    let multipart = multipart.map_err(|rejection| PredictError::MalformedForm(rejection.body_text()))?;
    let request = read_prediction_form(multipart, state.max_upload_bytes).await?;

    // Permit travels into the blocking task so it is held until inference ends
    let permit = state
        .permits
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| PredictError::Inference(anyhow::anyhow!("worker pool closed: {}", e)))?;

    let predictor = state.predictor.clone();
    tokio::task::spawn_blocking(move || {
        let _permit = permit;
        predictor.predict(request_id, &request)
    })
    .await
    .map_err(|e| PredictError::Inference(anyhow::anyhow!("inference task failed: {}", e)))?
}
