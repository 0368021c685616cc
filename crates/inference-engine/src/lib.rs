//! Digit Inference Engine
//!
//! Loads the trained digit classifier from the artifact store once at startup
//! and exposes read-only inference over normalized tensors.

mod classifier;
mod engine;
mod linear;
mod onnx;
mod scores;

pub use classifier::{decode_artifact, Classifier};
pub use engine::{DigitModel, Prediction};
pub use linear::{LinearClassifier, INPUT_FEATURES, LINEAR_MAGIC};
pub use onnx::OnnxClassifier;
pub use scores::{softmax, ClassScores, DigitLabel, NUM_CLASSES};

use artifact_store::StoreError;
use thiserror::Error;

/// Errors during model load or inference
#[derive(Debug, Error)]
pub enum ModelError {
    /// Store unreachable or object missing
    #[error("Model artifact unavailable: {0}")]
    ArtifactUnavailable(#[source] StoreError),
    /// Object fetched but not a usable classifier
    #[error("Model artifact corrupt: {0}")]
    ArtifactCorrupt(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
}
