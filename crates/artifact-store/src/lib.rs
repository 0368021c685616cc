//! Artifact Store
//!
//! Whole-object storage used to fetch training datasets and to publish and
//! retrieve the trained classifier. Objects are addressed by bucket and key
//! and are always transferred atomically (no partial reads).

mod fs;
mod http;
mod scratch;
mod settings;

pub use fs::FsArtifactStore;
pub use http::HttpArtifactStore;
pub use scratch::ScratchFile;
pub use settings::{StoreBackend, StoreSettings};

use async_trait::async_trait;
use thiserror::Error;

/// Artifact store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Object {bucket}/{key} not found")]
    NotFound { bucket: String, key: String },

    #[error("Artifact store unreachable: {0}")]
    Unreachable(String),

    #[error("Artifact store rejected request with status {status}")]
    Rejected { status: u16 },

    /// API key could not be exchanged for an access token
    #[error("Artifact store authentication failed: {0}")]
    Auth(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Durable key/object storage
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Fetch a whole object into a transient local file
    async fn download(&self, bucket: &str, key: &str) -> Result<ScratchFile, StoreError>;

    /// Store a whole object, replacing any previous version
    async fn upload(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Reject keys that could escape the bucket
pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty()
        || key.starts_with('/')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..")
    {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("mnist-model.bin").is_ok());
        assert!(validate_key("datasets/mnist_train.csv").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("../secret").is_err());
        assert!(validate_key("a//b").is_err());
    }
}
