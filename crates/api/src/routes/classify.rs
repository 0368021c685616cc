//! Digit classification route

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use metrics::counter;
use std::sync::Arc;
use tracing::{error, warn};

use crate::service::ServiceError;
use crate::AppState;

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::InputShape { .. } => StatusCode::BAD_REQUEST,
            ServiceError::Inference(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}

/// Classify a raw 200x200 RGBA drawing; responds with e.g. `[7]`
pub async fn classify_image(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<String, ServiceError> {
    let service = state.service.clone();

    // Normalization and inference are CPU-bound
    let result = tokio::task::spawn_blocking(move || service.handle_request(&body))
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))?;

    match &result {
        Ok(_) => counter!("digit_requests_total", "outcome" => "ok").increment(1),
        Err(e @ ServiceError::InputShape { .. }) => {
            warn!("Rejected request: {}", e);
            counter!("digit_requests_total", "outcome" => "bad_request").increment(1);
        }
        Err(e) => {
            error!("Request failed: {}", e);
            counter!("digit_requests_total", "outcome" => "error").increment(1);
        }
    }

    result
}
