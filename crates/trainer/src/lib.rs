//! Offline Digit Classifier Training
//!
//! Pulls the labeled CSV datasets from the artifact store, fits a linear
//! classifier and publishes it under the key the server loads at startup.

use thiserror::Error;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
pub mod dataset;
pub mod train;

pub use config::TrainerConfig;
pub use dataset::{Dataset, DatasetError};
pub use train::{evaluate, train, Evaluation, TrainingParams};

use artifact_store::{ArtifactStore, StoreError};
use inference_engine::ModelError;

/// Errors that abort a training run
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("Artifact store error: {0}")]
    Store(#[from] StoreError),
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error("Invalid training parameters: {0}")]
    InvalidParams(String),
    #[error("Training task failed: {0}")]
    Task(String),
}

/// Initialize logging
pub fn init_logging(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        debug!("Tracing subscriber already installed");
    }
}

/// Download one CSV object and parse it
async fn fetch_dataset(
    store: &dyn ArtifactStore,
    bucket: &str,
    key: &str,
) -> Result<Dataset, TrainerError> {
    let scratch = store.download(bucket, key).await?;

    // CSV parsing is CPU-bound; the scratch copy lives until it finishes
    let dataset = tokio::task::spawn_blocking(move || Dataset::from_csv_path(scratch.path()))
        .await
        .map_err(|e| TrainerError::Task(e.to_string()))??;
    debug!("Fetched {}/{}: {} rows", bucket, key, dataset.len());
    Ok(dataset)
}

/// Fetch, train, evaluate, publish
///
/// The published object replaces whatever was stored under the model key.
pub async fn run(config: &TrainerConfig) -> Result<Evaluation, TrainerError> {
    let params = config.training_params();
    params.validate()?;

    let store = config.store.connect()?;
    let test = fetch_dataset(store.as_ref(), &config.bucket_name, &config.test_csv).await?;
    let training = fetch_dataset(store.as_ref(), &config.bucket_name, &config.train_csv).await?;
    info!(
        "data loaded: {} training rows, {} test rows",
        training.len(),
        test.len()
    );

    let model = tokio::task::spawn_blocking(move || train(&training, &params))
        .await
        .map_err(|e| TrainerError::Task(e.to_string()))??;

    let evaluation = evaluate(&model, &test)?;
    info!(
        "Test accuracy: {:.4}, loss: {:.4}",
        evaluation.accuracy, evaluation.loss
    );

    info!("....saving");
    let bytes = model.to_bytes()?;
    store
        .upload(&config.bucket_name, &config.model_file_name, bytes)
        .await?;
    info!(
        "complete: published {}/{} to {} store",
        config.bucket_name,
        config.model_file_name,
        store.name()
    );

    Ok(evaluation)
}
