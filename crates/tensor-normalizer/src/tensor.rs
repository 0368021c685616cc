//! Classifier input tensor

use ndarray::Array4;

use crate::TENSOR_SHAPE;

/// (1, H, W, 1) tensor of f32 values in [0.0, 1.0]; 0.0 is background, 1.0 is ink
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor {
    data: Array4<f32>,
}

impl NormalizedTensor {
    pub(crate) fn new(data: Array4<f32>) -> Self {
        Self { data }
    }

    /// Build a tensor from pre-scaled row-major values
    ///
    /// Used by the trainer and by fixtures; the values must already be in
    /// [0.0, 1.0]. Returns `None` when `values` does not fill a 28x28 grid.
    pub fn from_scaled(values: Vec<f32>) -> Option<Self> {
        Array4::from_shape_vec(TENSOR_SHAPE, values).ok().map(Self::new)
    }

    /// Tensor shape as (batch, height, width, channels)
    pub fn shape(&self) -> [usize; 4] {
        let s = self.data.shape();
        [s[0], s[1], s[2], s[3]]
    }

    /// Borrow the underlying array
    pub fn as_array(&self) -> &Array4<f32> {
        &self.data
    }

    /// Value at (row, col) of the single-channel image
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        self.data.get([0, row, col, 0]).copied()
    }

    /// Row-major copy of all values
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

    /// Fraction of elements above one half
    pub fn ink_fraction(&self) -> f32 {
        let total = self.data.len();
        if total == 0 {
            return 0.0;
        }
        let inked = self.data.iter().filter(|v| **v > 0.5).count();
        inked as f32 / total as f32
    }
}
