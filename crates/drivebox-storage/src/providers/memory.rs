//! In-memory blob store.
//!
//! Backs tests and ephemeral deployments. Holds every blob as `Bytes` in a
//! concurrent map, so clones of the store share contents.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures::stream;
use std::sync::Arc;
use uuid::Uuid;

use drivebox_core::error::AppError;
use drivebox_core::result::AppResult;
use drivebox_core::traits::{BlobStore, ByteStream};

use super::{copy_path, scratch_path, upload_path};

/// Blob store keeping all content in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<DashMap<String, Bytes>>,
}

impl MemoryBlobStore {
    /// Create an empty in-memory blob store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently held.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Whether the store holds no blobs.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn put(&self, owner_id: Uuid, file_name: &str, data: Bytes) -> AppResult<String> {
        let path = upload_path(owner_id, file_name);
        self.blobs.insert(path.clone(), data);
        Ok(path)
    }

    async fn put_scratch(&self, file_name: &str, data: Bytes) -> AppResult<String> {
        let path = scratch_path(file_name);
        self.blobs.insert(path.clone(), data);
        Ok(path)
    }

    async fn read_bytes(&self, path: &str) -> AppResult<Bytes> {
        self.blobs
            .get(path)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::not_found(format!("Blob not found: {path}")))
    }

    async fn read(&self, path: &str) -> AppResult<ByteStream> {
        let data = self.read_bytes(path).await?;
        Ok(Box::pin(stream::once(async move { Ok(data) })))
    }

    async fn copy(&self, from: &str) -> AppResult<String> {
        let data = self.read_bytes(from).await?;
        let to = copy_path(from);
        self.blobs.insert(to.clone(), data);
        Ok(to)
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        self.blobs.remove(path);
        Ok(())
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        Ok(self.blobs.contains_key(path))
    }

    fn public_url(&self, path: &str) -> String {
        format!("memory://{path}")
    }
}
