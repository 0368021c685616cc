//! Transient local copies of downloaded objects

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

/// Local file holding a downloaded object, removed when dropped
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Reserve a unique path in the system temp directory
    pub fn reserve(key: &str) -> Self {
        let stem: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        let path = std::env::temp_dir().join(format!("artifact-{}-{}", Uuid::new_v4(), stem));
        Self { path }
    }

    /// Local path of the copy
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole copy into memory
    pub async fn read_bytes(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed scratch file {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove scratch file {}: {}", self.path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_removed_on_drop() {
        let scratch = ScratchFile::reserve("model.bin");
        tokio::fs::write(scratch.path(), b"weights").await.unwrap();
        let path = scratch.path().to_path_buf();

        assert_eq!(scratch.read_bytes().await.unwrap(), b"weights");
        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn test_unique_paths() {
        let a = ScratchFile::reserve("datasets/train.csv");
        let b = ScratchFile::reserve("datasets/train.csv");
        assert_ne!(a.path(), b.path());
        assert!(a.path().to_string_lossy().ends_with("datasets_train.csv"));
    }
}
