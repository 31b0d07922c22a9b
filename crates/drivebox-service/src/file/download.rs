//! Download preparation: single-file copies and ZIP bundles.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use drivebox_core::traits::BlobStore;
use drivebox_core::{AppError, AppResult};
use drivebox_entity::node::Node;
use drivebox_index::{TreeIndex, ROOT_NAME};

use crate::file::archive::ArchiveBuilder;
use crate::selection::{resolve_parent_folder, NodeSelection};

/// A prepared download: where to fetch it and what to call it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveHandle {
    /// Public URL of the prepared blob.
    pub url: String,
    /// Suggested file name for the download prompt.
    pub filename: String,
}

/// Prepares downloads for arbitrary node selections.
///
/// A single selected file is copied into the scratch area as-is; every
/// other selection is bundled into a ZIP archive first. The returned
/// [`ArchiveHandle`] points at the prepared blob either way.
#[derive(Debug, Clone)]
pub struct DownloadService {
    index: Arc<TreeIndex>,
    blob_store: Arc<dyn BlobStore>,
    archive: ArchiveBuilder,
}

impl DownloadService {
    /// Creates a new download service.
    pub fn new(
        index: Arc<TreeIndex>,
        blob_store: Arc<dyn BlobStore>,
        archive: ArchiveBuilder,
    ) -> Self {
        Self {
            index,
            blob_store,
            archive,
        }
    }

    /// Prepares a download for the selected nodes.
    pub async fn download(
        &self,
        owner_id: Uuid,
        selection: &NodeSelection,
    ) -> AppResult<ArchiveHandle> {
        if selection.is_empty_request() {
            return Err(AppError::empty_selection(
                "Please select files to download",
            ));
        }

        if selection.all {
            let parent =
                resolve_parent_folder(&self.index, owner_id, selection.parent_path.as_deref())
                    .await?;
            let children: Vec<Node> = self
                .index
                .children(owner_id, parent.id)
                .await?
                .into_iter()
                .filter(Node::is_active)
                .collect();
            if children.is_empty() {
                return Err(AppError::empty_folder("The folder is empty"));
            }
            return self
                .bundle(owner_id, &children, format!("{}.zip", parent.name))
                .await;
        }

        let nodes = self.resolve_ids(owner_id, &selection.ids).await?;

        if let [node] = nodes.as_slice() {
            if !node.is_folder {
                return self.copy_single(owner_id, node).await;
            }
            let has_content = self
                .index
                .children(owner_id, node.id)
                .await?
                .iter()
                .any(|c| c.is_active());
            if !has_content {
                return Err(AppError::empty_folder("The folder is empty"));
            }
            let filename = format!("{}.zip", node.name);
            return self.bundle(owner_id, &nodes, filename).await;
        }

        let filename = format!("{}.zip", self.common_parent_name(owner_id, &nodes).await?);
        self.bundle(owner_id, &nodes, filename).await
    }

    /// Looks up the selected ids, deduplicated, in selection order.
    /// Trashed nodes are treated as absent.
    async fn resolve_ids(&self, owner_id: Uuid, ids: &[Uuid]) -> AppResult<Vec<Node>> {
        let mut seen = HashSet::new();
        let mut nodes = Vec::with_capacity(ids.len());
        for &id in ids {
            if !seen.insert(id) {
                continue;
            }
            let node = self
                .index
                .find(owner_id, id)
                .await?
                .filter(Node::is_active)
                .ok_or_else(|| AppError::not_found("Node not found"))?;
            if node.is_root() {
                return Err(AppError::validation("Cannot download the root folder by id"));
            }
            nodes.push(node);
        }
        Ok(nodes)
    }

    /// Copies one file blob into the scratch area and hands out its URL.
    async fn copy_single(&self, owner_id: Uuid, node: &Node) -> AppResult<ArchiveHandle> {
        let storage_path = node.storage_path.as_deref().ok_or_else(|| {
            AppError::internal(format!("File node '{}' has no storage path", node.path))
        })?;
        let copy = self.blob_store.copy(storage_path).await?;
        info!(
            owner_id = %owner_id,
            node_id = %node.id,
            blob = %copy,
            "Prepared single file download"
        );
        Ok(ArchiveHandle {
            url: self.blob_store.public_url(&copy),
            filename: node.name.clone(),
        })
    }

    /// Archives the nodes and stores the payload in the scratch area.
    async fn bundle(
        &self,
        owner_id: Uuid,
        nodes: &[Node],
        filename: String,
    ) -> AppResult<ArchiveHandle> {
        let payload = self.archive.build(owner_id, nodes).await?;
        let blob_name = format!("{}.zip", Uuid::now_v7().simple());
        let path = self.blob_store.put_scratch(&blob_name, payload).await?;
        info!(
            owner_id = %owner_id,
            targets = nodes.len(),
            filename = %filename,
            blob = %path,
            "Prepared archive download"
        );
        Ok(ArchiveHandle {
            url: self.blob_store.public_url(&path),
            filename,
        })
    }

    /// The shared parent's name when every node sits in the same folder,
    /// otherwise the root name. Names the ZIP for multi-node selections.
    async fn common_parent_name(&self, owner_id: Uuid, nodes: &[Node]) -> AppResult<String> {
        let first = match nodes.first().and_then(|n| n.parent_id) {
            Some(id) => id,
            None => return Ok(ROOT_NAME.to_string()),
        };
        if nodes.iter().any(|n| n.parent_id != Some(first)) {
            return Ok(ROOT_NAME.to_string());
        }
        let parent = self
            .index
            .find(owner_id, first)
            .await?
            .ok_or_else(|| AppError::internal("Parent folder disappeared"))?;
        Ok(parent.name)
    }
}
