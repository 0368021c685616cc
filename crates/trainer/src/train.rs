//! Softmax-regression training and evaluation

use inference_engine::{ClassScores, LinearClassifier, ModelError};
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::Dataset;
use crate::TrainerError;

/// Gradient-descent settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingParams {
    pub epochs: usize,
    pub learning_rate: f32,
    pub batch_size: usize,
    /// Shuffle seed; equal seeds give identical models
    pub seed: u64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            epochs: 3,
            learning_rate: 0.5,
            batch_size: 100,
            seed: 42,
        }
    }
}

impl TrainingParams {
    pub fn validate(&self) -> Result<(), TrainerError> {
        if self.epochs == 0 || self.batch_size == 0 {
            return Err(TrainerError::InvalidParams(
                "epochs and batch_size must be positive".to_string(),
            ));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(TrainerError::InvalidParams(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Accuracy and mean cross-entropy on a dataset
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Evaluation {
    pub accuracy: f32,
    pub loss: f32,
    pub samples: usize,
}

/// Row-wise softmax of (rows, classes) logits
fn softmax_rows(mut logits: Array2<f32>) -> Array2<f32> {
    for mut row in logits.rows_mut() {
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    logits
}

fn batch_probabilities(model: &LinearClassifier, features: &Array2<f32>) -> Array2<f32> {
    let logits = features.dot(&model.weights().t()) + model.bias();
    softmax_rows(logits)
}

/// Fit a linear classifier with shuffled mini-batch gradient descent
pub fn train(data: &Dataset, params: &TrainingParams) -> Result<LinearClassifier, TrainerError> {
    params.validate()?;
    info!(
        "Training on {} rows: epochs={}, lr={}, batch={}",
        data.len(),
        params.epochs,
        params.learning_rate,
        params.batch_size
    );

    let mut model = LinearClassifier::zeros();
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut order: Vec<usize> = (0..data.len()).collect();

    for epoch in 0..params.epochs {
        order.shuffle(&mut rng);

        for batch in order.chunks(params.batch_size) {
            let x = data.features().select(Axis(0), batch);
            let mut grad = batch_probabilities(&model, &x);

            // d(loss)/d(logits) = p - onehot(label)
            for (r, &i) in batch.iter().enumerate() {
                grad[[r, data.labels()[i] as usize]] -= 1.0;
            }

            let grad_w = grad.t().dot(&x);
            let grad_b = grad.sum_axis(Axis(0));
            let step = -params.learning_rate / batch.len() as f32;

            let (weights, bias) = model.parameters_mut();
            weights.scaled_add(step, &grad_w);
            bias.scaled_add(step, &grad_b);
        }

        let progress = evaluate(&model, data)?;
        info!(
            "Epoch {}/{}: loss={:.4}, accuracy={:.4}",
            epoch + 1,
            params.epochs,
            progress.loss,
            progress.accuracy
        );
    }

    Ok(model)
}

/// Score a model against a labeled dataset
pub fn evaluate(model: &LinearClassifier, data: &Dataset) -> Result<Evaluation, ModelError> {
    let probabilities = batch_probabilities(model, data.features());

    let mut correct = 0usize;
    let mut loss = 0.0f32;
    for (row, &label) in probabilities.rows().into_iter().zip(data.labels()) {
        let scores = ClassScores::from_raw(row.to_vec())?;
        if scores.argmax().value() == label {
            correct += 1;
        }
        loss -= scores.probabilities()[label as usize].max(1e-12).ln();
    }

    let samples = data.len().max(1);
    let evaluation = Evaluation {
        accuracy: correct as f32 / samples as f32,
        loss: loss / samples as f32,
        samples: data.len(),
    };
    debug!("Evaluation: {:?}", evaluation);
    Ok(evaluation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use inference_engine::INPUT_FEATURES;

    /// Class 1 inks the left half, class 7 the right half
    fn halves_dataset(rows_per_class: usize) -> Dataset {
        let mut features = Array2::zeros((rows_per_class * 2, INPUT_FEATURES));
        let mut labels = Vec::new();
        for r in 0..rows_per_class * 2 {
            let left = r % 2 == 0;
            for p in 0..INPUT_FEATURES {
                let col = p % 28;
                if (col < 14) == left {
                    features[[r, p]] = 0.6 + 0.4 * ((r + p) % 3) as f32 / 2.0;
                }
            }
            labels.push(if left { 1 } else { 7 });
        }
        Dataset::from_parts(features, labels).unwrap()
    }

    #[test]
    fn test_learns_separable_classes() {
        let data = halves_dataset(10);
        let params = TrainingParams {
            epochs: 10,
            batch_size: 4,
            ..Default::default()
        };

        let model = train(&data, &params).unwrap();
        let evaluation = evaluate(&model, &data).unwrap();

        assert_eq!(evaluation.accuracy, 1.0);
        assert!(evaluation.loss < 0.1);
    }

    #[test]
    fn test_untrained_model_loss() {
        let data = halves_dataset(5);
        let evaluation = evaluate(&LinearClassifier::zeros(), &data).unwrap();

        // Uniform prediction: -ln(0.1)
        assert!((evaluation.loss - 2.302585).abs() < 1e-4);
        assert_eq!(evaluation.samples, 10);
    }

    #[test]
    fn test_seeded_training_is_reproducible() {
        let data = halves_dataset(6);
        let params = TrainingParams {
            epochs: 2,
            batch_size: 3,
            ..Default::default()
        };

        let a = train(&data, &params).unwrap();
        let b = train(&data, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_zero_epochs() {
        let params = TrainingParams {
            epochs: 0,
            ..Default::default()
        };
        assert!(matches!(
            train(&halves_dataset(1), &params),
            Err(TrainerError::InvalidParams(_))
        ));
    }
}
