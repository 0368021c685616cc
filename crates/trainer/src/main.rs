//! Digit Classifier Trainer - Main Entry Point

use tracing::{error, info};
use trainer::{init_logging, run, TrainerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = TrainerConfig::from_env()?;
    init_logging(config.debug);

    info!("=== Digit Classifier Trainer v{} ===", env!("CARGO_PKG_VERSION"));

    match run(&config).await {
        Ok(evaluation) => {
            info!(
                "Published model: accuracy={:.4} over {} test rows",
                evaluation.accuracy, evaluation.samples
            );
            Ok(())
        }
        Err(e) => {
            error!("Training failed: {}", e);
            Err(e.into())
        }
    }
}
