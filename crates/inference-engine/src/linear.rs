//! Multinomial logistic-regression classifier

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tensor_normalizer::{NormalizedTensor, TENSOR_SIDE};

use crate::classifier::Classifier;
use crate::scores::{softmax, NUM_CLASSES};
use crate::{ClassScores, ModelError};

/// Header identifying a linear classifier artifact
pub const LINEAR_MAGIC: &[u8; 8] = b"DIGITLIN";

const FORMAT_VERSION: u16 = 1;

/// Number of input features (28 x 28 pixels)
pub const INPUT_FEATURES: usize = TENSOR_SIDE * TENSOR_SIDE;

#[derive(Serialize, Deserialize)]
struct LinearArtifact {
    version: u16,
    inputs: u32,
    classes: u32,
    weights: Vec<f32>,
    bias: Vec<f32>,
}

/// Softmax over `weights . x + bias`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearClassifier {
    /// (classes, inputs)
    weights: Array2<f32>,
    bias: Array1<f32>,
}

impl LinearClassifier {
    /// Build from a (10, 784) weight matrix and a 10-element bias
    pub fn new(weights: Array2<f32>, bias: Array1<f32>) -> Result<Self, ModelError> {
        if weights.dim() != (NUM_CLASSES, INPUT_FEATURES) || bias.len() != NUM_CLASSES {
            return Err(ModelError::InvalidInputShape {
                expected: format!("weights ({NUM_CLASSES}, {INPUT_FEATURES}), bias {NUM_CLASSES}"),
                actual: format!("weights {:?}, bias {}", weights.dim(), bias.len()),
            });
        }
        Ok(Self { weights, bias })
    }

    /// All-zero parameters; predicts the uniform distribution
    pub fn zeros() -> Self {
        Self {
            weights: Array2::zeros((NUM_CLASSES, INPUT_FEATURES)),
            bias: Array1::zeros(NUM_CLASSES),
        }
    }

    pub fn weights(&self) -> &Array2<f32> {
        &self.weights
    }

    pub fn bias(&self) -> &Array1<f32> {
        &self.bias
    }

    /// Mutable parameter access for training
    pub fn parameters_mut(&mut self) -> (&mut Array2<f32>, &mut Array1<f32>) {
        (&mut self.weights, &mut self.bias)
    }

    /// Raw class logits for one flattened image
    pub fn logits(&self, features: ArrayView1<f32>) -> Array1<f32> {
        self.weights.dot(&features) + &self.bias
    }

    /// Class probabilities for one flattened image
    pub fn probabilities(&self, features: ArrayView1<f32>) -> Vec<f32> {
        let logits = self.logits(features);
        softmax(&logits.to_vec())
    }

    /// Serialize behind the [`LINEAR_MAGIC`] header
    pub fn to_bytes(&self) -> Result<Vec<u8>, ModelError> {
        let artifact = LinearArtifact {
            version: FORMAT_VERSION,
            inputs: INPUT_FEATURES as u32,
            classes: NUM_CLASSES as u32,
            weights: self.weights.iter().copied().collect(),
            bias: self.bias.to_vec(),
        };

        let mut bytes = LINEAR_MAGIC.to_vec();
        let payload = postcard::to_allocvec(&artifact)
            .map_err(|e| ModelError::InferenceFailed(format!("serialization failed: {e}")))?;
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Parse an artifact produced by [`LinearClassifier::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        let payload = bytes
            .strip_prefix(LINEAR_MAGIC.as_slice())
            .ok_or_else(|| ModelError::ArtifactCorrupt("missing linear artifact header".into()))?;

        let artifact: LinearArtifact = postcard::from_bytes(payload)
            .map_err(|e| ModelError::ArtifactCorrupt(format!("linear artifact: {e}")))?;

        if artifact.version != FORMAT_VERSION {
            return Err(ModelError::ArtifactCorrupt(format!(
                "unsupported linear artifact version {}",
                artifact.version
            )));
        }
        if artifact.inputs as usize != INPUT_FEATURES || artifact.classes as usize != NUM_CLASSES {
            return Err(ModelError::ArtifactCorrupt(format!(
                "linear artifact has {} inputs and {} classes",
                artifact.inputs, artifact.classes
            )));
        }

        let weights = Array2::from_shape_vec((NUM_CLASSES, INPUT_FEATURES), artifact.weights)
            .map_err(|e| ModelError::ArtifactCorrupt(format!("linear weights: {e}")))?;
        let bias = Array1::from_vec(artifact.bias);
        if bias.len() != NUM_CLASSES {
            return Err(ModelError::ArtifactCorrupt(format!(
                "linear bias has {} entries",
                bias.len()
            )));
        }

        Ok(Self { weights, bias })
    }
}

impl Classifier for LinearClassifier {
    fn predict(&self, tensor: &NormalizedTensor) -> Result<ClassScores, ModelError> {
        let features = Array1::from_vec(tensor.to_vec());
        if features.len() != INPUT_FEATURES {
            return Err(ModelError::InvalidInputShape {
                expected: INPUT_FEATURES.to_string(),
                actual: features.len().to_string(),
            });
        }
        ClassScores::from_raw(self.probabilities(features.view()))
    }

    fn describe(&self) -> String {
        format!("linear({INPUT_FEATURES}x{NUM_CLASSES})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Class 4 responds to ink in the top-left quadrant
    fn top_left_detector() -> LinearClassifier {
        let mut model = LinearClassifier::zeros();
        let (weights, _) = model.parameters_mut();
        for row in 0..14 {
            for col in 0..14 {
                weights[[4, row * TENSOR_SIDE + col]] = 1.0;
            }
        }
        model
    }

    #[test]
    fn test_zero_model_is_uniform() {
        let tensor = NormalizedTensor::from_scaled(vec![0.5; INPUT_FEATURES]).unwrap();
        let scores = LinearClassifier::zeros().predict(&tensor).unwrap();

        assert!(scores.probabilities().iter().all(|p| (p - 0.1).abs() < 1e-6));
        assert_eq!(scores.argmax().value(), 0);
    }

    #[test]
    fn test_detector_prediction() {
        let mut values = vec![0.0; INPUT_FEATURES];
        for row in 2..10 {
            for col in 2..10 {
                values[row * TENSOR_SIDE + col] = 1.0;
            }
        }
        let tensor = NormalizedTensor::from_scaled(values).unwrap();
        let scores = top_left_detector().predict(&tensor).unwrap();
        assert_eq!(scores.argmax().value(), 4);
    }

    #[test]
    fn test_bytes_round_trip() {
        let model = top_left_detector();
        let bytes = model.to_bytes().unwrap();
        assert!(bytes.starts_with(LINEAR_MAGIC));
        assert_eq!(LinearClassifier::from_bytes(&bytes).unwrap(), model);
    }

    #[test]
    fn test_rejects_wrong_dimensions() {
        let result = LinearClassifier::new(Array2::zeros((10, 10)), Array1::zeros(10));
        assert!(matches!(result, Err(ModelError::InvalidInputShape { .. })));
    }

    #[test]
    fn test_rejects_future_version() {
        let artifact = LinearArtifact {
            version: FORMAT_VERSION + 1,
            inputs: INPUT_FEATURES as u32,
            classes: NUM_CLASSES as u32,
            weights: vec![0.0; INPUT_FEATURES * NUM_CLASSES],
            bias: vec![0.0; NUM_CLASSES],
        };
        let mut bytes = LINEAR_MAGIC.to_vec();
        bytes.extend(postcard::to_allocvec(&artifact).unwrap());

        assert!(matches!(
            LinearClassifier::from_bytes(&bytes),
            Err(ModelError::ArtifactCorrupt(_))
        ));
    }
}
