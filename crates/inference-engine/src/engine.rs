//! Model access facade

use std::time::Instant;

use artifact_store::{ArtifactStore, StoreError};
use serde::{Deserialize, Serialize};
use tensor_normalizer::{NormalizedTensor, TENSOR_SHAPE};
use tracing::{debug, info};

use crate::classifier::{decode_artifact, Classifier};
use crate::{ClassScores, DigitLabel, ModelError};

/// Result of classifying one tensor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Arg-max class
    pub label: DigitLabel,
    /// Probability of the predicted class
    pub confidence: f32,
    /// Full distribution
    pub scores: ClassScores,
    /// Inference latency in microseconds
    pub latency_us: u64,
}

/// Loaded digit classifier
///
/// Constructed once before serving and shared read-only (`Arc<DigitModel>`)
/// across request handlers.
pub struct DigitModel {
    classifier: Box<dyn Classifier>,
    source: String,
}

impl DigitModel {
    /// Fetch `bucket/key`, decode it, and discard the local scratch copy
    pub async fn load(store: &dyn ArtifactStore, bucket: &str, key: &str) -> Result<Self, ModelError> {
        let start = Instant::now();
        info!("Loading model {}/{} from {} store", bucket, key, store.name());

        let scratch = store
            .download(bucket, key)
            .await
            .map_err(ModelError::ArtifactUnavailable)?;
        let bytes = scratch
            .read_bytes()
            .await
            .map_err(|e| ModelError::ArtifactUnavailable(StoreError::Io(e)))?;
        drop(scratch);

        let classifier = decode_artifact(&bytes)?;
        info!(
            "Loaded {} from {}/{} ({} bytes, {}ms)",
            classifier.describe(),
            bucket,
            key,
            bytes.len(),
            start.elapsed().as_millis()
        );

        Ok(Self {
            classifier,
            source: format!("{bucket}/{key}"),
        })
    }

    /// Wrap an in-memory classifier
    pub fn from_classifier(classifier: Box<dyn Classifier>) -> Self {
        info!("Using in-memory classifier {}", classifier.describe());
        Self {
            classifier,
            source: "memory".to_string(),
        }
    }

    /// Class probabilities for a normalized tensor
    pub fn predict(&self, tensor: &NormalizedTensor) -> Result<ClassScores, ModelError> {
        if tensor.shape() != TENSOR_SHAPE {
            return Err(ModelError::InvalidInputShape {
                expected: format!("{:?}", TENSOR_SHAPE),
                actual: format!("{:?}", tensor.shape()),
            });
        }
        self.classifier.predict(tensor)
    }

    /// Predict and pick the arg-max label
    pub fn classify(&self, tensor: &NormalizedTensor) -> Result<Prediction, ModelError> {
        let start = Instant::now();
        let scores = self.predict(tensor)?;
        let label = scores.argmax();
        let latency_us = start.elapsed().as_micros() as u64;

        debug!("Predicted {} (conf={:.3}, latency={}us)", label, scores.confidence(), latency_us);

        Ok(Prediction {
            label,
            confidence: scores.confidence(),
            scores,
            latency_us,
        })
    }

    /// Classifier description
    pub fn describe(&self) -> String {
        self.classifier.describe()
    }

    /// Where the classifier was loaded from
    pub fn source(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LinearClassifier;
    use artifact_store::FsArtifactStore;
    use std::sync::Arc;
    use tensor_normalizer::{Normalizer, NormalizerConfig};

    fn temp_store() -> (FsArtifactStore, std::path::PathBuf) {
        let root = std::env::temp_dir().join(format!("engine-test-{}", uuid::Uuid::new_v4()));
        (FsArtifactStore::new(&root), root)
    }

    /// Always answers with a fixed distribution
    struct FixedClassifier(Vec<f32>);

    impl Classifier for FixedClassifier {
        fn predict(&self, _tensor: &NormalizedTensor) -> Result<ClassScores, ModelError> {
            ClassScores::from_raw(self.0.clone())
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    #[tokio::test]
    async fn test_load_linear_artifact() {
        let (store, root) = temp_store();
        let bytes = LinearClassifier::zeros().to_bytes().unwrap();
        store.upload("mnist-model", "mnist-model.bin", bytes).await.unwrap();

        let model = DigitModel::load(&store, "mnist-model", "mnist-model.bin").await.unwrap();
        assert_eq!(model.source(), "mnist-model/mnist-model.bin");
        assert!(model.describe().starts_with("linear"));

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_load_onnx_artifact() {
        let (store, root) = temp_store();
        let bytes = include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/halves.onnx"));
        store.upload("mnist-model", "mnist-model.onnx", bytes.to_vec()).await.unwrap();

        let model = DigitModel::load(&store, "mnist-model", "mnist-model.onnx").await.unwrap();
        assert!(model.describe().starts_with("onnx("));

        let values = (0..784).map(|p| if p % 28 >= 14 { 0.8 } else { 0.0 }).collect();
        let tensor = NormalizedTensor::from_scaled(values).unwrap();
        let prediction = model.classify(&tensor).unwrap();
        assert!(prediction.label.value() <= 9);
        assert_eq!(prediction.label.as_response(), "[7]");

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_missing_artifact_is_unavailable() {
        let (store, _root) = temp_store();
        let result = DigitModel::load(&store, "mnist-model", "mnist-model.bin").await;
        assert!(matches!(result, Err(ModelError::ArtifactUnavailable(StoreError::NotFound { .. }))));
    }

    #[tokio::test]
    async fn test_corrupt_artifact() {
        let (store, root) = temp_store();
        store.upload("mnist-model", "mnist-model.bin", b"not a model".to_vec()).await.unwrap();

        let result = DigitModel::load(&store, "mnist-model", "mnist-model.bin").await;
        assert!(matches!(result, Err(ModelError::ArtifactCorrupt(_))));

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn test_classify_with_fixed_scores() {
        let mut scores = vec![0.05; 10];
        scores[2] = 0.55;
        let model = DigitModel::from_classifier(Box::new(FixedClassifier(scores)));
        let tensor = NormalizedTensor::from_scaled(vec![0.0; 784]).unwrap();

        let prediction = model.classify(&tensor).unwrap();
        assert_eq!(prediction.label.value(), 2);
        assert!((prediction.confidence - 0.55).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_wrong_tensor_shape() {
        let model = DigitModel::from_classifier(Box::new(LinearClassifier::zeros()));
        let normalizer = Normalizer::new(NormalizerConfig {
            source_side: 40,
            body_side: 10,
            border: 2,
            ..Default::default()
        })
        .unwrap();
        let tensor = normalizer.normalize(&vec![0u8; 40 * 40 * 4]).unwrap();

        assert!(matches!(model.predict(&tensor), Err(ModelError::InvalidInputShape { .. })));
    }

    #[test]
    fn test_concurrent_predictions() {
        let model = Arc::new(DigitModel::from_classifier(Box::new(LinearClassifier::zeros())));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let model = Arc::clone(&model);
                std::thread::spawn(move || {
                    let tensor = NormalizedTensor::from_scaled(vec![0.3; 784]).unwrap();
                    model.classify(&tensor).unwrap().label.value()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 0);
        }
    }
}
