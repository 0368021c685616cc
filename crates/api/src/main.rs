//! Digit Classification Server - Main Entry Point

use api::{init_logging, run_server, ServiceConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::from_env()?;
    init_logging(config.debug);

    info!("=== Digit Classifier v{} ===", env!("CARGO_PKG_VERSION"));

    // Never serve without a loaded model
    if let Err(e) = run_server(config).await {
        error!("Server stopped: {}", e);
        return Err(e.into());
    }

    Ok(())
}
