//! Trainer configuration from the environment

use std::collections::HashMap;

use artifact_store::StoreSettings;
use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::train::TrainingParams;

/// Training job settings
///
/// | Variable          | Default           |
/// |-------------------|-------------------|
/// | `DEBUG`           | `false`           |
/// | `BUCKET_NAME`     | `mnist-model`     |
/// | `MODEL_FILE_NAME` | `mnist-model.bin` |
/// | `TRAIN_CSV`       | `mnist_train.csv` |
/// | `TEST_CSV`        | `mnist_test.csv`  |
/// | `EPOCHS`          | `3`               |
/// | `LEARNING_RATE`   | `0.5`             |
/// | `BATCH_SIZE`      | `100`             |
/// | `SEED`            | `42`              |
#[derive(Debug, Clone, Deserialize)]
pub struct TrainerConfig {
    pub debug: bool,
    pub bucket_name: String,
    pub model_file_name: String,
    pub train_csv: String,
    pub test_csv: String,
    pub epochs: usize,
    pub learning_rate: f32,
    pub batch_size: usize,
    pub seed: u64,
    #[serde(skip)]
    pub store: StoreSettings,
}

impl TrainerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    pub fn from_map(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::load(Some(vars))
    }

    fn load(vars: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let defaults = TrainingParams::default();
        let mut config: Self = Config::builder()
            .set_default("debug", false)?
            .set_default("bucket_name", "mnist-model")?
            .set_default("model_file_name", "mnist-model.bin")?
            .set_default("train_csv", "mnist_train.csv")?
            .set_default("test_csv", "mnist_test.csv")?
            .set_default("epochs", defaults.epochs as u64)?
            .set_default("learning_rate", defaults.learning_rate as f64)?
            .set_default("batch_size", defaults.batch_size as u64)?
            .set_default("seed", defaults.seed)?
            .add_source(Environment::default().try_parsing(true).source(vars.clone()))
            .build()?
            .try_deserialize()?;

        config.store = match vars {
            Some(vars) => StoreSettings::from_map(vars),
            None => StoreSettings::from_env(),
        }
        .map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(config)
    }

    /// Gradient-descent settings for this job
    pub fn training_params(&self) -> TrainingParams {
        TrainingParams {
            epochs: self.epochs,
            learning_rate: self.learning_rate,
            batch_size: self.batch_size,
            seed: self.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrainerConfig::from_map(HashMap::new()).unwrap();
        assert_eq!(config.train_csv, "mnist_train.csv");
        assert_eq!(config.test_csv, "mnist_test.csv");
        assert_eq!(config.model_file_name, "mnist-model.bin");
        assert_eq!(config.epochs, 3);
        assert!((config.learning_rate - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_overrides() {
        let vars = HashMap::from([
            ("EPOCHS".to_string(), "12".to_string()),
            ("LEARNING_RATE".to_string(), "0.1".to_string()),
            ("TRAIN_CSV".to_string(), "digits/train.csv".to_string()),
        ]);
        let config = TrainerConfig::from_map(vars).unwrap();
        let params = config.training_params();

        assert_eq!(params.epochs, 12);
        assert!((params.learning_rate - 0.1).abs() < 1e-6);
        assert_eq!(config.train_csv, "digits/train.csv");
    }
}
