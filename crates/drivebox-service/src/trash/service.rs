//! Active → Trashed → Deleted lifecycle transitions.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use tracing::info;
use uuid::Uuid;

use drivebox_core::config::TrashConfig;
use drivebox_core::traits::BlobStore;
use drivebox_core::{AppError, AppResult};
use drivebox_entity::node::Node;
use drivebox_index::TreeIndex;

use crate::selection::{resolve_parent_folder, trash_roots, NodeSelection};

/// Drives nodes through the trash lifecycle.
///
/// Trashing and restoring only stamp the `deleted_at` flag; nodes keep
/// their place in the tree so restore needs no bound arithmetic. Only
/// [`TrashService::delete_forever`] changes the structure, and it removes
/// the blobs before it touches the tree.
#[derive(Debug, Clone)]
pub struct TrashService {
    index: Arc<TreeIndex>,
    blob_store: Arc<dyn BlobStore>,
    config: TrashConfig,
}

impl TrashService {
    /// Creates a new trash service.
    pub fn new(index: Arc<TreeIndex>, blob_store: Arc<dyn BlobStore>, config: TrashConfig) -> Self {
        Self {
            index,
            blob_store,
            config,
        }
    }

    /// Moves the selected nodes and their whole subtrees to the trash.
    ///
    /// Every affected node receives the same timestamp, which is what
    /// later ties a cascade back together on restore. Returns the number
    /// of nodes stamped.
    pub async fn move_to_trash(&self, owner_id: Uuid, selection: &NodeSelection) -> AppResult<u64> {
        if selection.is_empty_request() {
            return Err(AppError::empty_selection("Please select files to delete"));
        }

        let targets = if selection.all {
            let parent =
                resolve_parent_folder(&self.index, owner_id, selection.parent_path.as_deref())
                    .await?;
            self.index
                .children(owner_id, parent.id)
                .await?
                .into_iter()
                .filter(Node::is_active)
                .collect()
        } else {
            let mut targets = Vec::with_capacity(selection.ids.len());
            for &id in &selection.ids {
                let node = self
                    .index
                    .find(owner_id, id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Node not found"))?;
                if node.is_root() {
                    return Err(AppError::validation("Cannot trash the root folder"));
                }
                if node.is_trashed() {
                    return Err(AppError::validation(format!(
                        "'{}' is already in the trash",
                        node.name
                    )));
                }
                targets.push(node);
            }
            targets
        };

        let mut ids = Vec::new();
        let mut seen = HashSet::new();
        for target in &targets {
            for member in self.index.subtree(owner_id, target.id).await? {
                if seen.insert(member.id) {
                    ids.push(member.id);
                }
            }
        }
        if ids.is_empty() {
            return Ok(0);
        }

        let stamp = Utc::now();
        self.index.set_deleted(owner_id, &ids, Some(stamp)).await?;
        info!(
            owner_id = %owner_id,
            targets = targets.len(),
            nodes = ids.len(),
            "Moved to trash"
        );
        Ok(ids.len() as u64)
    }

    /// Restores the selected trashed nodes. Returns the number of nodes
    /// whose flag was cleared.
    ///
    /// With `cascade_on_restore` enabled, descendants that share the
    /// target's trash timestamp come back with it; otherwise only the
    /// selected nodes themselves become active again and their trashed
    /// descendants surface as new trash roots.
    pub async fn restore(&self, owner_id: Uuid, selection: &NodeSelection) -> AppResult<u64> {
        if selection.is_empty_request() {
            return Err(AppError::empty_selection("Please select files to restore"));
        }

        let targets = self.trashed_targets(owner_id, selection, "restored").await?;

        let mut ids = Vec::new();
        let mut seen = HashSet::new();
        for target in &targets {
            if self.config.cascade_on_restore {
                for member in self.index.subtree(owner_id, target.id).await? {
                    if member.deleted_at == target.deleted_at && seen.insert(member.id) {
                        ids.push(member.id);
                    }
                }
            } else if seen.insert(target.id) {
                ids.push(target.id);
            }
        }

        self.index.set_deleted(owner_id, &ids, None).await?;
        info!(
            owner_id = %owner_id,
            targets = targets.len(),
            nodes = ids.len(),
            "Restored from trash"
        );
        Ok(ids.len() as u64)
    }

    /// Permanently deletes the selected trashed nodes: blobs first, then
    /// the tree records. Returns the number of nodes removed.
    ///
    /// A blob failure aborts before any structural change, so the nodes
    /// stay in the trash and the purge can be retried; blobs that are
    /// already gone do not count as failures.
    pub async fn delete_forever(&self, owner_id: Uuid, selection: &NodeSelection) -> AppResult<u64> {
        if selection.is_empty_request() {
            return Err(AppError::empty_selection("Please select files to delete"));
        }

        let mut targets = self.trashed_targets(owner_id, selection, "deleted").await?;
        targets.sort_by_key(|n| n.lft);

        let mut removed_total = 0u64;
        let mut last_rgt = i64::MIN;
        for target in targets {
            // A target nested inside an earlier target is already gone.
            if target.lft < last_rgt {
                continue;
            }
            last_rgt = target.rgt;

            let members = self.index.subtree(owner_id, target.id).await?;
            self.purge_blobs(&members).await?;
            let removed = self.index.detach(owner_id, target.id).await?;
            removed_total += removed.len() as u64;
        }

        info!(
            owner_id = %owner_id,
            nodes = removed_total,
            "Deleted forever"
        );
        Ok(removed_total)
    }

    /// Resolves a restore/delete-forever selection to its trashed targets.
    /// `all` means every trash root; explicit ids must name trashed nodes.
    async fn trashed_targets(
        &self,
        owner_id: Uuid,
        selection: &NodeSelection,
        action: &str,
    ) -> AppResult<Vec<Node>> {
        if selection.all {
            return trash_roots(&self.index, owner_id).await;
        }

        let mut targets = Vec::with_capacity(selection.ids.len());
        let mut seen = HashSet::new();
        for &id in &selection.ids {
            if !seen.insert(id) {
                continue;
            }
            let node = self
                .index
                .find(owner_id, id)
                .await?
                .ok_or_else(|| AppError::not_found("Node not found"))?;
            if node.is_active() {
                return Err(AppError::validation(format!(
                    "'{}' must be moved to trash before it can be {action}",
                    node.name
                )));
            }
            targets.push(node);
        }
        Ok(targets)
    }

    /// Deletes every file blob in the given subtree, concurrently.
    async fn purge_blobs(&self, members: &[Node]) -> AppResult<()> {
        let deletes = members
            .iter()
            .filter(|n| !n.is_folder)
            .map(|n| self.purge_one(n));
        try_join_all(deletes).await?;
        Ok(())
    }

    async fn purge_one(&self, node: &Node) -> AppResult<()> {
        let path = match node.storage_path.as_deref() {
            Some(path) => path,
            None => return Ok(()),
        };
        self.blob_store.delete(path).await.map_err(|e| {
            AppError::new(
                e.kind,
                format!("Failed to delete content of '{}': {}", node.name, e.message),
            )
        })
    }
}
