//! Service configuration from the environment

use std::collections::HashMap;

use artifact_store::StoreSettings;
use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Inference service settings
///
/// | Variable          | Default           |
/// |-------------------|-------------------|
/// | `HOST`            | `0.0.0.0`         |
/// | `PORT`            | `8080`            |
/// | `DEBUG`           | `false`           |
/// | `BUCKET_NAME`     | `mnist-model`     |
/// | `MODEL_FILE_NAME` | `mnist-model.bin` |
///
/// Artifact store variables are documented on [`StoreSettings`].
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub bucket_name: String,
    pub model_file_name: String,
    #[serde(skip)]
    pub store: StoreSettings,
}

impl ServiceConfig {
    /// Read from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Read from an explicit variable map
    pub fn from_map(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::load(Some(vars))
    }

    fn load(vars: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let mut config: Self = Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8080)?
            .set_default("debug", false)?
            .set_default("bucket_name", "mnist-model")?
            .set_default("model_file_name", "mnist-model.bin")?
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

    /// Socket address to listen on
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
