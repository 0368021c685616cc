//! Digit Classification API Server
//!
//! Loads the trained classifier at startup, then serves `POST /image`
//! requests carrying raw RGBA drawings.

use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
mod routes;
pub mod service;

pub use config::ServiceConfig;
pub use service::{InferenceService, ServiceError};

use artifact_store::StoreError;
use inference_engine::{DigitModel, ModelError};
use tensor_normalizer::Normalizer;

/// Errors that keep the server from reaching a serving state
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error("Artifact store error: {0}")]
    Store(#[from] StoreError),
    #[error("Model load failed: {0}")]
    Model(#[from] ModelError),
    #[error("Failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Application state shared across handlers
pub struct AppState {
    /// Inference service holding the loaded model
    pub service: InferenceService,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
    /// Prometheus handle when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state around a loaded model
    pub fn new(model: DigitModel) -> Self {
        Self {
            service: InferenceService::new(Arc::new(model), Normalizer::default()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
            metrics: None,
        }
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/image", post(routes::classify::classify_image))
        .route("/api/v1/health", get(routes::health::health))
        .route("/metrics", get(routes::metrics::render))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
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

/// Install the global Prometheus recorder
pub fn install_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics recorder unavailable: {}", e);
            None
        }
    }
}

/// Connect to the artifact store and load the classifier
///
/// Returns before any socket is bound; an error here means the process must
/// not serve.
pub async fn bootstrap(config: &ServiceConfig) -> Result<AppState, StartupError> {
    let store = config.store.connect()?;
    let model = DigitModel::load(store.as_ref(), &config.bucket_name, &config.model_file_name).await?;
    info!("Loaded Model from {} store", store.name());
    Ok(AppState::new(model))
}

/// Load the model, then run the server until shutdown
pub async fn run_server(config: ServiceConfig) -> Result<(), StartupError> {
    let mut state = bootstrap(&config).await?;
    state.metrics = install_metrics();
    let app = create_router(Arc::new(state));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(StartupError::Bind)?;
    info!("application ready on {} - Debug is {}", addr, config.debug);

    axum::serve(listener, app).await.map_err(StartupError::Serve)?;
    Ok(())
}
