//! Classifier abstraction and artifact decoding

use tensor_normalizer::NormalizedTensor;
use tracing::debug;

use crate::linear::{LinearClassifier, LINEAR_MAGIC};
use crate::onnx::OnnxClassifier;
use crate::{ClassScores, ModelError};

/// Trained digit classifier
///
/// Implementations must not mutate state in `predict`; one instance serves
/// every concurrent request.
pub trait Classifier: Send + Sync {
    /// Score a (1, 28, 28, 1) tensor
    fn predict(&self, tensor: &NormalizedTensor) -> Result<ClassScores, ModelError>;

    /// Short description for logs and health output
    fn describe(&self) -> String;
}

/// Decode a serialized classifier artifact
///
/// Linear artifacts carry the [`LINEAR_MAGIC`] header; anything else is
/// treated as an ONNX graph.
pub fn decode_artifact(bytes: &[u8]) -> Result<Box<dyn Classifier>, ModelError> {
    if bytes.is_empty() {
        return Err(ModelError::ArtifactCorrupt("artifact is empty".to_string()));
    }

    if bytes.starts_with(LINEAR_MAGIC) {
        debug!("Decoding linear classifier artifact ({} bytes)", bytes.len());
        Ok(Box::new(LinearClassifier::from_bytes(bytes)?))
    } else {
        debug!("Decoding ONNX classifier artifact ({} bytes)", bytes.len());
        Ok(Box::new(OnnxClassifier::from_bytes(bytes)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_artifact() {
        assert!(matches!(decode_artifact(&[]), Err(ModelError::ArtifactCorrupt(_))));
    }

    #[test]
    fn test_garbage_artifact() {
        let err = decode_artifact(b"definitely not a model").err().unwrap();
        assert!(matches!(err, ModelError::ArtifactCorrupt(_)));
    }

    #[test]
    fn test_truncated_linear_artifact() {
        let bytes = LinearClassifier::zeros().to_bytes().unwrap();
        let err = decode_artifact(&bytes[..bytes.len() / 2]).err().unwrap();
        assert!(matches!(err, ModelError::ArtifactCorrupt(_)));
    }

    #[test]
    fn test_onnx_artifact_dispatch() {
        let bytes = include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/halves.onnx"));
        let classifier = decode_artifact(bytes).unwrap();
        assert!(classifier.describe().starts_with("onnx("));
    }

    #[test]
    fn test_linear_artifact_dispatch() {
        let bytes = LinearClassifier::zeros().to_bytes().unwrap();
        let classifier = decode_artifact(&bytes).unwrap();
        assert!(classifier.describe().starts_with("linear"));
    }
}
