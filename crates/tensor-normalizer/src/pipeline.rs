//! Normalization pipeline

use std::fmt;

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::NormalizerConfig;
use crate::raw::RawImage;
use crate::stages;
use crate::tensor::NormalizedTensor;
use crate::NormalizeError;

/// Named pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Decode,
    Downscale,
    FlattenAlpha,
    Grayscale,
    Pad,
    Invert,
    Scale,
}

impl PipelineStage {
    /// Execution order
    pub const ORDER: [PipelineStage; 7] = [
        PipelineStage::Decode,
        PipelineStage::Downscale,
        PipelineStage::FlattenAlpha,
        PipelineStage::Grayscale,
        PipelineStage::Pad,
        PipelineStage::Invert,
        PipelineStage::Scale,
    ];

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Decode => "decode",
            PipelineStage::Downscale => "downscale",
            PipelineStage::FlattenAlpha => "flatten_alpha",
            PipelineStage::Grayscale => "grayscale",
            PipelineStage::Pad => "pad",
            PipelineStage::Invert => "invert",
            PipelineStage::Scale => "scale",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drawing-to-tensor normalizer
///
/// Holds only configuration, so one instance can be shared by every request.
#[derive(Debug, Clone)]
pub struct Normalizer {
    config: NormalizerConfig,
    filter: FilterType,
}

impl Normalizer {
    /// Create a normalizer with the given geometry
    pub fn new(config: NormalizerConfig) -> Result<Self, NormalizeError> {
        config.validate()?;
        Ok(Self {
            filter: config.filter.into(),
            config,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Run every stage in order over a raw RGBA payload
    pub fn normalize(&self, bytes: &[u8]) -> Result<NormalizedTensor, NormalizeError> {
        let raw = RawImage::with_side(bytes, self.config.source_side)?;

        let decoded = stages::decode(raw)?;
        let body = stages::downscale(&decoded, self.config.body_side, self.filter);
        let flat = stages::flatten_alpha(&body);
        let gray = stages::grayscale(&flat);
        let padded = stages::pad(&gray, self.config.border);
        let inverted = stages::invert(padded);
        let tensor = stages::to_tensor(&inverted)?;

        debug!(
            "Normalized {}x{} drawing to {:?} (ink={:.3})",
            self.config.source_side,
            self.config.source_side,
            tensor.shape(),
            tensor.ink_fraction()
        );

        Ok(tensor)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        let config = NormalizerConfig::default();
        Self {
            filter: config.filter.into(),
            config,
        }
    }
}

/// Normalize a 200x200 RGBA payload with the default configuration
pub fn normalize(bytes: &[u8]) -> Result<NormalizedTensor, NormalizeError> {
    Normalizer::default().normalize(bytes)
}
