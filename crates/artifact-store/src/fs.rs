//! Local directory backend

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{validate_key, ArtifactStore, ScratchFile, StoreError};

/// Artifact store rooted at a local directory; each bucket is a sub-directory
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Create a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        info!("Using filesystem artifact store at {}", root.display());
        Self { root }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(bucket)?;
        validate_key(key)?;
        Ok(self.root.join(bucket).join(key))
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn download(&self, bucket: &str, key: &str) -> Result<ScratchFile, StoreError> {
        let source = self.object_path(bucket, key)?;
        let scratch = ScratchFile::reserve(key);

        match tokio::fs::copy(&source, scratch.path()).await {
            Ok(size) => {
                debug!("Fetched {}/{} ({} bytes)", bucket, key, size);
                Ok(scratch)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn upload(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let target = self.object_path(bucket, key)?;
        let parent = target
            .parent()
            .ok_or_else(|| StoreError::InvalidKey(key.to_string()))?;
        tokio::fs::create_dir_all(parent).await?;

        // Write beside the target then rename so readers never see a partial object
        let staging = parent.join(format!(".{}.partial", Uuid::new_v4()));
        tokio::fs::write(&staging, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&staging, &target).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(StoreError::Io(e));
        }

        info!("Stored {}/{} ({} bytes)", bucket, key, bytes.len());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("fs-store-test-{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_upload_then_download() {
        let root = temp_root();
        let store = FsArtifactStore::new(&root);

        store.upload("mnist-model", "mnist-model.bin", b"v1".to_vec()).await.unwrap();
        let scratch = store.download("mnist-model", "mnist-model.bin").await.unwrap();
        assert_eq!(scratch.read_bytes().await.unwrap(), b"v1");

        drop(scratch);
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_upload_overwrites() {
        let root = temp_root();
        let store = FsArtifactStore::new(&root);

        store.upload("bucket", "model.bin", b"old".to_vec()).await.unwrap();
        store.upload("bucket", "model.bin", b"new".to_vec()).await.unwrap();
        let scratch = store.download("bucket", "model.bin").await.unwrap();
        assert_eq!(scratch.read_bytes().await.unwrap(), b"new");

        // No staging files left behind
        let leftovers = std::fs::read_dir(root.join("bucket"))
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .map(|e| e.file_name().to_string_lossy().ends_with(".partial"))
                    .unwrap_or(false)
            })
            .count();
        assert_eq!(leftovers, 0);

        drop(scratch);
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_missing_object() {
        let store = FsArtifactStore::new(temp_root());
        let err = store.download("bucket", "absent.bin").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let store = FsArtifactStore::new(temp_root());
        let err = store.download("bucket", "../outside").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }
}
