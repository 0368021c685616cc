//! Raw drawing payload

use crate::NormalizeError;

/// Square RGBA bitmap exactly as submitted by the drawing surface
#[derive(Debug, Clone)]
pub struct RawImage {
    data: Vec<u8>,
    side: u32,
}

impl RawImage {
    /// Wrap a default-sized (200x200) RGBA payload
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, NormalizeError> {
        Self::with_side(bytes, crate::SOURCE_SIDE)
    }

    /// Wrap an RGBA payload of the given side length
    pub fn with_side(bytes: &[u8], side: u32) -> Result<Self, NormalizeError> {
        let expected = (side as usize) * (side as usize) * crate::BYTES_PER_PIXEL;
        if bytes.len() != expected {
            return Err(NormalizeError::InputShape {
                expected,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            data: bytes.to_vec(),
            side,
        })
    }

    /// Side length in pixels
    pub fn side(&self) -> u32 {
        self.side
    }

    /// Raw RGBA bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_exact_length() {
        let raw = RawImage::from_bytes(&vec![0u8; crate::SOURCE_BYTES]).unwrap();
        assert_eq!(raw.side(), 200);
        assert_eq!(raw.as_bytes().len(), 160_000);
    }

    #[test]
    fn test_rejects_short_payload() {
        let err = RawImage::from_bytes(&[0u8; 100]).unwrap_err();
        match err {
            NormalizeError::InputShape { expected, actual } => {
                assert_eq!(expected, 160_000);
                assert_eq!(actual, 100);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_oversized_payload() {
        assert!(RawImage::from_bytes(&vec![0u8; crate::SOURCE_BYTES + 4]).is_err());
    }
}
