//! Normalizer configuration

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::{NormalizeError, BODY_SIDE, BORDER, SOURCE_SIDE};

/// Resampling filter used when shrinking the drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleFilter {
    Nearest,
    /// Tent filter; its support grows with the shrink ratio so it averages
    /// over the covered source area
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResampleFilter> for FilterType {
    fn from(filter: ResampleFilter) -> Self {
        match filter {
            ResampleFilter::Nearest => FilterType::Nearest,
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Gaussian => FilterType::Gaussian,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Normalization geometry and resampling policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Side length of the incoming square drawing (pixels)
    pub source_side: u32,
    /// Side length of the downscaled digit body (pixels)
    pub body_side: u32,
    /// White border added on every side after downscaling (pixels)
    pub border: u32,
    /// Resampling filter for the downscale stage
    pub filter: ResampleFilter,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            source_side: SOURCE_SIDE,
            body_side: BODY_SIDE,
            border: BORDER,
            filter: ResampleFilter::Triangle,
        }
    }
}

impl NormalizerConfig {
    /// Expected payload length in bytes
    pub fn source_bytes(&self) -> usize {
        (self.source_side as usize) * (self.source_side as usize) * crate::BYTES_PER_PIXEL
    }

    /// Side length of the produced tensor
    pub fn output_side(&self) -> usize {
        (self.body_side + 2 * self.border) as usize
    }

    /// Check the geometry is usable
    pub fn validate(&self) -> Result<(), NormalizeError> {
        if self.source_side == 0 || self.body_side == 0 {
            return Err(NormalizeError::Config(format!(
                "image sides must be non-zero (source={}, body={})",
                self.source_side, self.body_side
            )));
        }
        if self.body_side > self.source_side {
            return Err(NormalizeError::Config(format!(
                "body side {} exceeds source side {}",
                self.body_side, self.source_side
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_geometry() {
        let config = NormalizerConfig::default();
        assert_eq!(config.source_bytes(), 160_000);
        assert_eq!(config.output_side(), 28);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_body() {
        let config = NormalizerConfig {
            body_side: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(NormalizeError::Config(_))));
    }

    #[test]
    fn test_rejects_upscale() {
        let config = NormalizerConfig {
            source_side: 10,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
