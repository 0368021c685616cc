//! ONNX classifier backed by tract

use std::io::Cursor;

use tensor_normalizer::{NormalizedTensor, TENSOR_SHAPE};
use tract_onnx::prelude::*;
use tracing::info;

use crate::classifier::Classifier;
use crate::{ClassScores, ModelError};

/// Optimized ONNX graph with its input pinned to f32 (1, 28, 28, 1)
pub struct OnnxClassifier {
    plan: TypedRunnableModel<TypedModel>,
    nodes: usize,
}

impl OnnxClassifier {
    /// Parse and optimize an ONNX graph held in memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        let mut reader = Cursor::new(bytes);

        let model = tract_onnx::onnx()
            .model_for_read(&mut reader)
            .and_then(|model| model.with_input_fact(0, f32::fact(TENSOR_SHAPE).into()))
            .and_then(|model| model.into_optimized())
            .map_err(|e| ModelError::ArtifactCorrupt(format!("onnx: {e}")))?;

        let nodes = model.nodes.len();
        let plan = model
            .into_runnable()
            .map_err(|e| ModelError::ArtifactCorrupt(format!("onnx plan: {e}")))?;

        info!("ONNX classifier ready ({} nodes)", nodes);
        Ok(Self { plan, nodes })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, tensor: &NormalizedTensor) -> Result<ClassScores, ModelError> {
        let values = tensor.to_vec();
        let input = Tensor::from_shape(&tensor.shape(), &values)
            .map_err(|e| ModelError::InferenceFailed(e.to_string()))?;

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| ModelError::InferenceFailed(e.to_string()))?;

        let first = outputs
            .first()
            .ok_or_else(|| ModelError::InferenceFailed("model produced no outputs".to_string()))?;
        let scores = first
            .as_slice::<f32>()
            .map_err(|e| ModelError::InferenceFailed(e.to_string()))?;

        ClassScores::from_raw(scores.to_vec())
    }

    fn describe(&self) -> String {
        format!("onnx({} nodes)", self.nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flatten -> MatMul -> Add -> Softmax; left-half ink scores 1, right-half ink 7
    const HALVES_ONNX: &[u8] = include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/halves.onnx"));

    fn half_inked(left: bool) -> NormalizedTensor {
        let values = (0..784)
            .map(|p| if (p % 28 < 14) == left { 1.0 } else { 0.0 })
            .collect();
        NormalizedTensor::from_scaled(values).unwrap()
    }

    #[test]
    fn test_loads_graph_with_pinned_input() {
        let classifier = OnnxClassifier::from_bytes(HALVES_ONNX).unwrap();
        assert!(classifier.describe().starts_with("onnx("));

        let scores = classifier.predict(&half_inked(true)).unwrap();
        assert_eq!(scores.probabilities().len(), 10);
        let total: f32 = scores.probabilities().iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert_eq!(scores.argmax().value(), 1);

        assert_eq!(classifier.predict(&half_inked(false)).unwrap().argmax().value(), 7);
    }

    #[test]
    fn test_blank_tensor_ties_to_lowest_label() {
        let classifier = OnnxClassifier::from_bytes(HALVES_ONNX).unwrap();
        let blank = NormalizedTensor::from_scaled(vec![0.0; 784]).unwrap();
        assert_eq!(classifier.predict(&blank).unwrap().argmax().value(), 0);
    }

    #[test]
    fn test_rejects_non_onnx_bytes() {
        let result = OnnxClassifier::from_bytes(&[0xff, 0x00, 0x13, 0x37, 0x42]);
        assert!(matches!(result, Err(ModelError::ArtifactCorrupt(_))));
    }
}
