//! Artifact store settings from the environment

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment};
use serde::{Deserialize, Serialize};

use crate::{ArtifactStore, FsArtifactStore, HttpArtifactStore, StoreError};

/// Default object gateway endpoint
pub const DEFAULT_ENDPOINT: &str = "https://s3.eu-gb.cloud-object-storage.appdomain.cloud";

/// Default token service trading the API key for access tokens
pub const DEFAULT_AUTH_ENDPOINT: &str = "https://iam.cloud.ibm.com/identity/token";

/// Storage backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Local directory tree
    Fs,
    /// HTTP object gateway
    Http,
}

/// Where artifacts live and how to reach them
///
/// | Variable                | Default                     |
/// |-------------------------|-----------------------------|
/// | `ARTIFACT_BACKEND`      | `http`                      |
/// | `COS_ENDPOINT`          | [`DEFAULT_ENDPOINT`]        |
/// | `COS_API_KEY_ID`        | unset                       |
/// | `COS_AUTH_ENDPOINT`     | [`DEFAULT_AUTH_ENDPOINT`]   |
/// | `ARTIFACT_ROOT`         | `./artifacts`               |
/// | `ARTIFACT_TIMEOUT_SECS` | `30`                        |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(rename = "artifact_backend")]
    pub backend: StoreBackend,
    #[serde(rename = "cos_endpoint")]
    pub endpoint: String,
    #[serde(rename = "cos_api_key_id", default)]
    pub api_key: Option<String>,
    /// Token service for the API key; empty sends the key as the bearer token
    #[serde(rename = "cos_auth_endpoint")]
    pub auth_endpoint: String,
    #[serde(rename = "artifact_root")]
    pub root: PathBuf,
    #[serde(rename = "artifact_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Http,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            auth_endpoint: DEFAULT_AUTH_ENDPOINT.to_string(),
            root: PathBuf::from("./artifacts"),
            timeout_secs: 30,
        }
    }
}

impl StoreSettings {
    /// Read settings from process environment variables
    pub fn from_env() -> Result<Self, StoreError> {
        Self::load(None)
    }

    /// Read settings from an explicit variable map
    pub fn from_map(vars: HashMap<String, String>) -> Result<Self, StoreError> {
        Self::load(Some(vars))
    }

    fn load(vars: Option<HashMap<String, String>>) -> Result<Self, StoreError> {
        Config::builder()
            .set_default("artifact_backend", "http")
            .and_then(|b| b.set_default("cos_endpoint", DEFAULT_ENDPOINT))
            .and_then(|b| b.set_default("cos_auth_endpoint", DEFAULT_AUTH_ENDPOINT))
            .and_then(|b| b.set_default("artifact_root", "./artifacts"))
            .and_then(|b| b.set_default("artifact_timeout_secs", 30))
            .map_err(|e| StoreError::Config(e.to_string()))?
            .add_source(Environment::default().try_parsing(true).source(vars))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Build the configured store
    pub fn connect(&self) -> Result<Box<dyn ArtifactStore>, StoreError> {
        match self.backend {
            StoreBackend::Fs => Ok(Box::new(FsArtifactStore::new(&self.root))),
            StoreBackend::Http => {
                let mut store = HttpArtifactStore::new(
                    &self.endpoint,
                    self.api_key.clone(),
                    Duration::from_secs(self.timeout_secs),
                )?;
                if !self.auth_endpoint.is_empty() {
                    store = store.with_auth_endpoint(&self.auth_endpoint);
                }
                Ok(Box::new(store))
            }
        }
    }
}
