//! # drivebox-storage
//!
//! Blob store implementations for Drivebox: local filesystem and
//! in-memory. The [`BlobStore`] trait itself lives in `drivebox-core`.

pub mod providers;

use std::sync::Arc;

use drivebox_core::config::storage::StorageConfig;
use drivebox_core::error::AppError;
use drivebox_core::result::AppResult;
use drivebox_core::traits::BlobStore;

pub use providers::local::LocalBlobStore;
pub use providers::memory::MemoryBlobStore;

/// Build the blob store named by `storage.default_provider`.
pub async fn blob_store_from_config(config: &StorageConfig) -> AppResult<Arc<dyn BlobStore>> {
    match config.default_provider.as_str() {
        "local" => Ok(Arc::new(LocalBlobStore::new(&config.local).await?)),
        "memory" => Ok(Arc::new(MemoryBlobStore::new())),
        other => Err(AppError::configuration(format!(
            "Unknown storage provider '{other}'"
        ))),
    }
}
