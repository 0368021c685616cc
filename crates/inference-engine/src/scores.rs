//! Class score vectors and labels

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Number of digit classes
pub const NUM_CLASSES: usize = 10;

/// Predicted digit in [0, 9]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DigitLabel(u8);

impl DigitLabel {
    /// Wrap a class index; `None` outside [0, 9]
    pub fn new(index: usize) -> Option<Self> {
        (index < NUM_CLASSES).then_some(Self(index as u8))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Response body form: a one-element array, e.g. `[7]`
    pub fn as_response(&self) -> String {
        format!("[{}]", self.0)
    }
}

impl fmt::Display for DigitLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Numerically stable softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}

/// Probability distribution over the ten digit classes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassScores {
    probabilities: Vec<f32>,
}

impl ClassScores {
    /// Validate raw classifier output, applying softmax when it is not already
    /// a probability distribution
    pub fn from_raw(raw: Vec<f32>) -> Result<Self, ModelError> {
        if raw.len() != NUM_CLASSES {
            return Err(ModelError::InferenceFailed(format!(
                "classifier produced {} scores, expected {}",
                raw.len(),
                NUM_CLASSES
            )));
        }
        if raw.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::InferenceFailed(
                "classifier produced non-finite scores".to_string(),
            ));
        }

        let sum: f32 = raw.iter().sum();
        let is_distribution = raw.iter().all(|v| *v >= 0.0) && (sum - 1.0).abs() < 1e-3;
        let probabilities = if is_distribution { raw } else { softmax(&raw) };

        Ok(Self { probabilities })
    }

    pub fn probabilities(&self) -> &[f32] {
        &self.probabilities
    }

    /// Index of the largest score; ties go to the lowest index
    pub fn argmax(&self) -> DigitLabel {
        let mut best = 0;
        for (i, p) in self.probabilities.iter().enumerate().skip(1) {
            if *p > self.probabilities[best] {
                best = i;
            }
        }
        DigitLabel(best as u8)
    }

    /// Probability of the arg-max class
    pub fn confidence(&self) -> f32 {
        self.probabilities[self.argmax().0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_picks_largest() {
        let mut raw = vec![0.01; 10];
        raw[7] = 0.91;
        let scores = ClassScores::from_raw(raw).unwrap();
        assert_eq!(scores.argmax().value(), 7);
        assert!((scores.confidence() - 0.91).abs() < 1e-6);
    }

    #[test]
    fn test_argmax_tie_prefers_lowest_index() {
        let mut raw = vec![0.0; 10];
        raw[3] = 0.4;
        raw[8] = 0.4;
        raw[5] = 0.2;
        let scores = ClassScores::from_raw(raw).unwrap();
        assert_eq!(scores.argmax().value(), 3);
    }

    #[test]
    fn test_uniform_scores_pick_zero() {
        let scores = ClassScores::from_raw(vec![0.1; 10]).unwrap();
        assert_eq!(scores.argmax().value(), 0);
    }

    #[test]
    fn test_logits_become_distribution() {
        let raw = vec![-2.0, 1.0, 0.5, 3.0, 0.0, 0.0, -1.0, 2.0, 0.1, 0.2];
        let scores = ClassScores::from_raw(raw).unwrap();
        let sum: f32 = scores.probabilities().iter().sum();

        assert!((sum - 1.0).abs() < 1e-5);
        assert!(scores.probabilities().iter().all(|p| *p >= 0.0));
        assert_eq!(scores.argmax().value(), 3);
    }

    #[test]
    fn test_distribution_kept_as_is() {
        let mut raw = vec![0.0; 10];
        raw[2] = 1.0;
        let scores = ClassScores::from_raw(raw.clone()).unwrap();
        assert_eq!(scores.probabilities(), raw.as_slice());
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(ClassScores::from_raw(vec![0.5, 0.5]).is_err());
    }

    #[test]
    fn test_nan_rejected() {
        let mut raw = vec![0.1; 10];
        raw[4] = f32::NAN;
        assert!(ClassScores::from_raw(raw).is_err());
    }

    #[test]
    fn test_label_formatting() {
        let label = DigitLabel::new(7).unwrap();
        assert_eq!(label.to_string(), "7");
        assert_eq!(label.as_response(), "[7]");
        assert!(DigitLabel::new(10).is_none());
    }
}
