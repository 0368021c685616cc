//! Tensor Normalizer
//!
//! Converts a raw RGBA drawing captured by the client into the numeric tensor
//! the digit classifier was trained on:
//! - Decode the 200x200 RGBA buffer
//! - Downscale to the 20x20 digit body
//! - Flatten alpha onto a white canvas
//! - Collapse to luminance
//! - Pad with a 4px white border to 28x28
//! - Invert polarity (ink = 255)
//! - Reshape to (1, 28, 28, 1) and scale into [0.0, 1.0]

pub mod config;
pub mod pipeline;
pub mod raw;
pub mod stages;
pub mod tensor;

pub use config::{NormalizerConfig, ResampleFilter};
pub use pipeline::{normalize, Normalizer, PipelineStage};
pub use raw::RawImage;
pub use tensor::NormalizedTensor;

use thiserror::Error;

/// Side length of the client drawing surface
pub const SOURCE_SIDE: u32 = 200;
/// Bytes per RGBA pixel
pub const BYTES_PER_PIXEL: usize = 4;
/// Exact payload length of a raw drawing
pub const SOURCE_BYTES: usize = (SOURCE_SIDE as usize) * (SOURCE_SIDE as usize) * BYTES_PER_PIXEL;
/// Side length of the digit body before padding
pub const BODY_SIDE: u32 = 20;
/// Border added on each side of the digit body
pub const BORDER: u32 = 4;
/// Side length of the classifier input
pub const TENSOR_SIDE: usize = (BODY_SIDE + 2 * BORDER) as usize;
/// Classifier input shape (batch, height, width, channels)
pub const TENSOR_SHAPE: [usize; 4] = [1, TENSOR_SIDE, TENSOR_SIDE, 1];

/// Errors raised while normalizing a drawing
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// Payload is not a 200x200 RGBA buffer
    #[error("Invalid input shape: expected {expected} bytes, got {actual}")]
    InputShape { expected: usize, actual: usize },

    #[error("Pipeline stage {stage} failed: {reason}")]
    Stage { stage: PipelineStage, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}
