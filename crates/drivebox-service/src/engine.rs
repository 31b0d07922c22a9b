//! Engine assembly: builds every service from one configuration.

use std::sync::Arc;

use tracing::info;

use drivebox_core::config::AppConfig;
use drivebox_core::traits::BlobStore;
use drivebox_core::AppResult;
use drivebox_index::TreeIndex;
use drivebox_storage::blob_store_from_config;

use crate::file::{ArchiveBuilder, BrowseService, DownloadService, UploadService};
use crate::folder::FolderService;
use crate::trash::TrashService;

/// The assembled application: every service wired to one shared tree
/// index and one shared blob store.
///
/// Cloning the engine is cheap; all fields are handles to the same
/// underlying state.
#[derive(Debug, Clone)]
pub struct DriveEngine {
    /// The loaded configuration.
    pub config: AppConfig,
    /// The shared tree index.
    pub index: Arc<TreeIndex>,
    /// The shared blob store.
    pub blob_store: Arc<dyn BlobStore>,
    /// Folder creation and moves.
    pub folders: FolderService,
    /// File uploads.
    pub uploads: UploadService,
    /// Listing, search, trash page, and breadcrumbs.
    pub browse: BrowseService,
    /// Trash lifecycle transitions.
    pub trash: TrashService,
    /// Download preparation.
    pub downloads: DownloadService,
}

impl DriveEngine {
    /// Builds the engine with the blob store named by the configuration.
    pub async fn new(config: AppConfig) -> AppResult<Self> {
        // ── Step 1: Blob store ───────────────────────────────────────
        info!(
            provider = %config.storage.default_provider,
            "Initializing blob store"
        );
        let blob_store = blob_store_from_config(&config.storage).await?;
        Ok(Self::with_blob_store(config, blob_store))
    }

    /// Builds the engine around an already constructed blob store.
    pub fn with_blob_store(config: AppConfig, blob_store: Arc<dyn BlobStore>) -> Self {
        // ── Step 2: Tree index ───────────────────────────────────────
        let index = Arc::new(TreeIndex::new());

        // ── Step 3: Services ─────────────────────────────────────────
        let folders = FolderService::new(Arc::clone(&index));
        let uploads = UploadService::new(
            Arc::clone(&index),
            Arc::clone(&blob_store),
            config.storage.clone(),
        );
        let browse = BrowseService::new(Arc::clone(&index));
        let trash = TrashService::new(
            Arc::clone(&index),
            Arc::clone(&blob_store),
            config.trash.clone(),
        );
        let archive = ArchiveBuilder::new(
            Arc::clone(&index),
            Arc::clone(&blob_store),
            config.archive.clone(),
        );
        let downloads =
            DownloadService::new(Arc::clone(&index), Arc::clone(&blob_store), archive);
        info!("Services initialized");

        Self {
            config,
            index,
            blob_store,
            folders,
            uploads,
            browse,
            trash,
            downloads,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_engine_builds() {
        let config = AppConfig {
            storage: drivebox_core::config::StorageConfig {
                default_provider: "memory".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let engine = DriveEngine::new(config).await.unwrap();
        assert_eq!(engine.blob_store.provider_type(), "memory");
    }

    #[tokio::test]
    async fn test_unknown_provider_is_a_configuration_error() {
        let config = AppConfig {
            storage: drivebox_core::config::StorageConfig {
                default_provider: "s3".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = DriveEngine::new(config).await.unwrap_err();
        assert_eq!(err.kind, drivebox_core::error::ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let engine = DriveEngine::with_blob_store(
            AppConfig::default(),
            Arc::new(drivebox_storage::MemoryBlobStore::new()),
        );
        let clone = engine.clone();
        let owner = uuid::Uuid::new_v4();

        let folder = engine
            .folders
            .create_folder(
                owner,
                crate::folder::CreateFolderRequest {
                    parent_path: None,
                    name: "Shared".into(),
                },
            )
            .await
            .unwrap();

        let found = clone.index.find(owner, folder.id).await.unwrap();
        assert!(found.is_some());
    }
}
