//! Request-level inference service

use std::sync::Arc;

use inference_engine::{DigitModel, ModelError, Prediction};
use metrics::{counter, histogram};
use tensor_normalizer::{NormalizeError, Normalizer};
use thiserror::Error;
use tracing::{debug, info};

/// Per-request failures; none of them touch the shared model
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Payload is not a 200x200 RGBA buffer
    #[error("Invalid input shape: expected {expected} bytes, got {actual}")]
    InputShape { expected: usize, actual: usize },

    #[error("Inference failed: {0}")]
    Inference(#[from] ModelError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<NormalizeError> for ServiceError {
    fn from(e: NormalizeError) -> Self {
        match e {
            NormalizeError::InputShape { expected, actual } => {
                ServiceError::InputShape { expected, actual }
            }
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

/// Normalize, predict, and format one drawing
#[derive(Clone)]
pub struct InferenceService {
    model: Arc<DigitModel>,
    normalizer: Normalizer,
}

impl InferenceService {
    pub fn new(model: Arc<DigitModel>, normalizer: Normalizer) -> Self {
        Self { model, normalizer }
    }

    /// Shared model handle
    pub fn model(&self) -> &DigitModel {
        &self.model
    }

    /// Classify a raw RGBA payload
    pub fn classify(&self, payload: &[u8]) -> Result<Prediction, ServiceError> {
        let tensor = self.normalizer.normalize(payload)?;
        let prediction = self.model.classify(&tensor)?;

        histogram!("digit_inference_latency_ms").record(prediction.latency_us as f64 / 1000.0);
        counter!("digit_predictions_total", "label" => prediction.label.to_string()).increment(1);
        info!("Predicted Image is : [{}]", prediction.label);
        debug!("Scores: {:?}", prediction.scores.probabilities());

        Ok(prediction)
    }

    /// Classify and format the response body, e.g. `[7]`
    pub fn handle_request(&self, payload: &[u8]) -> Result<String, ServiceError> {
        self.classify(payload).map(|p| p.label.as_response())
    }
}
