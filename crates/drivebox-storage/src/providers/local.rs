//! Local filesystem blob store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::StreamExt;
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::debug;
use uuid::Uuid;

use drivebox_core::config::storage::LocalStorageConfig;
use drivebox_core::error::{AppError, ErrorKind};
use drivebox_core::result::AppResult;
use drivebox_core::traits::{BlobStore, ByteStream};

use super::{copy_path, scratch_path, upload_path};

/// Blob store backed by a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    /// Root directory for all stored blobs.
    root: PathBuf,
    /// URL prefix prepended to blob paths by [`BlobStore::public_url`].
    public_base_url: String,
}

impl LocalBlobStore {
    /// Create a new local blob store rooted at the configured path.
    pub async fn new(config: &LocalStorageConfig) -> AppResult<Self> {
        let root = PathBuf::from(&config.root_path);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self {
            root,
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Resolve a relative blob path to an absolute path within the root.
    fn resolve(&self, path: &str) -> PathBuf {
        let clean = path.trim_start_matches('/');
        self.root.join(clean)
    }

    /// Ensure the parent directory of a path exists.
    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    async fn write(&self, path: &str, data: &Bytes) -> AppResult<()> {
        let full_path = self.resolve(path);
        self.ensure_parent(&full_path).await?;
        fs::write(&full_path, data).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to write blob: {path}"), e)
        })?;
        debug!(path, bytes = data.len(), "Wrote blob");
        Ok(())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(self.root.exists() && self.root.is_dir())
    }

    async fn put(&self, owner_id: Uuid, file_name: &str, data: Bytes) -> AppResult<String> {
        let path = upload_path(owner_id, file_name);
        self.write(&path, &data).await?;
        Ok(path)
    }

    async fn put_scratch(&self, file_name: &str, data: Bytes) -> AppResult<String> {
        let path = scratch_path(file_name);
        self.write(&path, &data).await?;
        Ok(path)
    }

    async fn read_bytes(&self, path: &str) -> AppResult<Bytes> {
        let full_path = self.resolve(path);
        let data = fs::read(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("Blob not found: {path}"))
            } else {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to read blob: {path}"),
                    e,
                )
            }
        })?;
        Ok(Bytes::from(data))
    }

    async fn read(&self, path: &str) -> AppResult<ByteStream> {
        let full_path = self.resolve(path);
        let file = fs::File::open(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("Blob not found: {path}"))
            } else {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to open blob: {path}"),
                    e,
                )
            }
        })?;

        let stream = ReaderStream::new(file);
        Ok(Box::pin(stream.map(|r| r.map(|b| b.into()))))
    }

    async fn copy(&self, from: &str) -> AppResult<String> {
        let to = copy_path(from);
        let from_path = self.resolve(from);
        let to_path = self.resolve(&to);
        self.ensure_parent(&to_path).await?;

        fs::copy(&from_path, &to_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("Blob not found: {from}"))
            } else {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to copy {from} -> {to}"),
                    e,
                )
            }
        })?;
        debug!(from, to, "Copied blob");
        Ok(to)
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        let full_path = self.resolve(path);
        if full_path.exists() {
            fs::remove_file(&full_path).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to delete blob: {path}"),
                    e,
                )
            })?;
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        Ok(self.resolve(path).exists())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn make_store(dir: &tempfile::TempDir) -> LocalBlobStore {
        let config = LocalStorageConfig {
            root_path: dir.path().to_string_lossy().into_owned(),
            public_base_url: "/storage".to_string(),
        };
        LocalBlobStore::new(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_put_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(&dir).await;
        let owner = Uuid::new_v4();

        let path = store
            .put(owner, "hello.txt", Bytes::from("hello world"))
            .await
            .unwrap();
        assert!(path.starts_with(&format!("uploads/{owner}/")));
        assert!(store.exists(&path).await.unwrap());

        let read_back = store.read_bytes(&path).await.unwrap();
        assert_eq!(read_back, Bytes::from("hello world"));

        store.delete(&path).await.unwrap();
        assert!(!store.exists(&path).await.unwrap());
        // Deleting again is fine.
        store.delete(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(&dir).await;
        let err = store.read_bytes("uploads/nope").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_copy_lands_in_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(&dir).await;
        let owner = Uuid::new_v4();

        let original = store
            .put(owner, "notes.txt", Bytes::from("content"))
            .await
            .unwrap();
        let copy = store.copy(&original).await.unwrap();

        assert!(copy.starts_with("scratch/"));
        assert!(copy.ends_with(".txt"));
        assert_eq!(store.read_bytes(&copy).await.unwrap(), Bytes::from("content"));
        // The original is untouched.
        assert!(store.exists(&original).await.unwrap());
    }

    #[tokio::test]
    async fn test_streaming_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(&dir).await;
        let path = store
            .put_scratch("stream.bin", Bytes::from(vec![7u8; 4096]))
            .await
            .unwrap();

        let mut stream = store.read(&path).await.unwrap();
        let mut total = 0usize;
        while let Some(chunk) = stream.next().await {
            total += chunk.unwrap().len();
        }
        assert_eq!(total, 4096);
    }

    #[tokio::test]
    async fn test_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(&dir).await;
        assert_eq!(
            store.public_url("scratch/bundle.zip"),
            "/storage/scratch/bundle.zip"
        );
    }
}
