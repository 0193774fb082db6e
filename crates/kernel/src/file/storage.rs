//! File storage backends.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::service::sanitize_filename;

/// Storage for media files, addressed by `scheme://path` URIs.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Write data at the given URI, replacing any existing file.
    async fn write(&self, uri: &str, data: &[u8]) -> Result<()>;

    async fn read(&self, uri: &str) -> Result<Vec<u8>>;

    async fn delete(&self, uri: &str) -> Result<()>;

    async fn exists(&self, uri: &str) -> Result<bool>;

    /// URI for `filename` under `dir` that no existing file uses.
    async fn unique_uri(&self, dir: &str, filename: &str) -> Result<String>;

    /// Public URL for a stored file.
    fn public_url(&self, uri: &str) -> String;
}

/// Local filesystem storage.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalFileStorage {
    pub fn new(base_path: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            base_url: base_url.into(),
        }
    }

    /// Resolve a `local://` URI below the base path.
    ///
    /// Rejects `..` components.
    fn resolve(&self, uri: &str) -> Result<PathBuf> {
        let path = uri
            .strip_prefix("local://")
            .context("invalid local URI, must start with local://")?;
        if Path::new(path)
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            bail!("directory traversal not allowed in storage URI");
        }
        Ok(self.base_path.join(path))
    }

    fn uri_for(dir: &str, filename: &str) -> String {
        let dir = dir.trim_matches('/');
        if dir.is_empty() {
            format!("local://{filename}")
        } else {
            format!("local://{dir}/{filename}")
        }
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn write(&self, uri: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(uri)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("failed to create directories")?;
        }

        let mut file = fs::File::create(&path)
            .await
            .context("failed to create file")?;
        file.write_all(data).await.context("failed to write file")?;
        file.flush().await.context("failed to flush file")?;

        debug!(uri = %uri, path = ?path, size = data.len(), "file written");
        Ok(())
    }

    async fn read(&self, uri: &str) -> Result<Vec<u8>> {
        let path = self.resolve(uri)?;
        let data = fs::read(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(data)
    }

    async fn delete(&self, uri: &str) -> Result<()> {
        let path = self.resolve(uri)?;
        if fs::try_exists(&path).await.unwrap_or(false) {
            fs::remove_file(&path)
                .await
                .context("failed to delete file")?;
            debug!(uri = %uri, "file deleted");
        } else {
            warn!(uri = %uri, "file not found for deletion");
        }
        Ok(())
    }

    async fn exists(&self, uri: &str) -> Result<bool> {
        let path = self.resolve(uri)?;
        fs::try_exists(&path)
            .await
            .context("failed to check file existence")
    }

    async fn unique_uri(&self, dir: &str, filename: &str) -> Result<String> {
        let safe = sanitize_filename(filename);
        let uri = Self::uri_for(dir, &safe);
        if !self.exists(&uri).await? {
            return Ok(uri);
        }

        let suffix = uuid::Uuid::now_v7().simple().to_string();
        let suffix = &suffix[suffix.len() - 7..];
        let renamed = match safe.rsplit_once('.') {
            Some((stem, ext)) => format!("{stem}_{suffix}.{ext}"),
            None => format!("{safe}_{suffix}"),
        };
        Ok(Self::uri_for(dir, &renamed))
    }

    fn public_url(&self, uri: &str) -> String {
        let path = uri.strip_prefix("local://").unwrap_or(uri);
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use faciles_test_utils::{ScratchDir, scratch_dir};

    use super::*;

    fn temp_storage(name: &str) -> (LocalFileStorage, ScratchDir) {
        let dir = scratch_dir(&format!("storage-{name}"));
        (LocalFileStorage::new(dir.path(), "/media"), dir)
    }

    #[test]
    fn traversal_is_rejected() {
        let storage = LocalFileStorage::new("/tmp/uploads", "/media");
        assert!(storage.resolve("local://../../etc/passwd").is_err());
        assert!(storage.resolve("s3://bucket/key").is_err());
        assert!(storage.resolve("local://images/a.png").is_ok());
    }

    #[test]
    fn public_url_joins_base() {
        let storage = LocalFileStorage::new("/tmp/uploads", "https://example.com/media/");
        assert_eq!(
            storage.public_url("local://original_images/a.png"),
            "https://example.com/media/original_images/a.png"
        );
    }

    #[tokio::test]
    async fn write_read_delete() {
        let (storage, _dir) = temp_storage("rw");
        let uri = "local://original_images/a.png";
        storage.write(uri, b"data").await.unwrap();
        assert!(storage.exists(uri).await.unwrap());
        assert_eq!(storage.read(uri).await.unwrap(), b"data");
        storage.delete(uri).await.unwrap();
        assert!(!storage.exists(uri).await.unwrap());
    }

    #[tokio::test]
    async fn unique_uri_avoids_existing_files() {
        let (storage, _dir) = temp_storage("unique");
        let first = storage.unique_uri("original_images", "My Photo.png").await.unwrap();
        assert_eq!(first, "local://original_images/My_Photo.png");

        storage.write(&first, b"x").await.unwrap();
        let second = storage.unique_uri("original_images", "My Photo.png").await.unwrap();
        assert_ne!(second, first);
        assert!(second.starts_with("local://original_images/My_Photo_"));
        assert!(second.ends_with(".png"));
    }
}
