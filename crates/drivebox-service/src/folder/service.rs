//! Folder creation and relocation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use drivebox_core::{AppError, AppResult};
use drivebox_entity::node::{CreateNode, Node};
use drivebox_index::TreeIndex;

use crate::selection::resolve_parent_folder;

/// Request payload for creating a folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFolderRequest {
    /// Parent folder path. Empty or absent targets the root folder.
    #[serde(default)]
    pub parent_path: Option<String>,
    /// Name of the new folder.
    pub name: String,
}

/// Request payload for moving a node into another folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveNodeRequest {
    /// The node to move.
    pub id: Uuid,
    /// Destination folder path. Empty or absent targets the root folder.
    #[serde(default)]
    pub new_parent_path: Option<String>,
}

/// Service for folder management.
#[derive(Debug, Clone)]
pub struct FolderService {
    index: Arc<TreeIndex>,
}

impl FolderService {
    /// Create a new folder service.
    pub fn new(index: Arc<TreeIndex>) -> Self {
        Self { index }
    }

    /// Create a folder under the given parent path.
    pub async fn create_folder(
        &self,
        owner_id: Uuid,
        request: CreateFolderRequest,
    ) -> AppResult<Node> {
        let parent =
            resolve_parent_folder(&self.index, owner_id, request.parent_path.as_deref()).await?;
        let node = self
            .index
            .append_node(owner_id, parent.id, CreateNode::folder(request.name))
            .await?;
        info!(owner_id = %owner_id, path = %node.path, "Created folder");
        Ok(node)
    }

    /// Move a node, together with its subtree, under another folder.
    ///
    /// Trashed items must be restored before they can be moved.
    pub async fn move_node(&self, owner_id: Uuid, request: MoveNodeRequest) -> AppResult<Node> {
        let node = self
            .index
            .find(owner_id, request.id)
            .await?
            .ok_or_else(|| AppError::not_found("Node not found"))?;
        if node.is_trashed() {
            return Err(AppError::validation(
                "Cannot move an item that is in the trash",
            ));
        }

        let dest =
            resolve_parent_folder(&self.index, owner_id, request.new_parent_path.as_deref())
                .await?;
        let moved = self.index.move_node(owner_id, node.id, dest.id).await?;
        info!(
            owner_id = %owner_id,
            node_id = %moved.id,
            path = %moved.path,
            "Moved node"
        );
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drivebox_core::error::ErrorKind;

    fn service() -> (FolderService, Arc<TreeIndex>, Uuid) {
        let index = Arc::new(TreeIndex::new());
        (FolderService::new(index.clone()), index, Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_create_folder_at_root_and_nested() {
        let (folders, index, owner) = service();

        let docs = folders
            .create_folder(
                owner,
                CreateFolderRequest {
                    parent_path: None,
                    name: "Docs".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(docs.path, "/Docs");
        assert!(docs.is_folder);

        let sub = folders
            .create_folder(
                owner,
                CreateFolderRequest {
                    parent_path: Some("/Docs".into()),
                    name: "Sub".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(sub.path, "/Docs/Sub");
        assert_eq!(sub.parent_id, Some(docs.id));
        index.verify(owner).await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_folder_name_is_a_conflict() {
        let (folders, _index, owner) = service();
        let request = CreateFolderRequest {
            parent_path: None,
            name: "Docs".into(),
        };

        folders.create_folder(owner, request.clone()).await.unwrap();
        let err = folders.create_folder(owner, request).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_move_rewrites_descendant_paths() {
        let (folders, index, owner) = service();
        let docs = folders
            .create_folder(
                owner,
                CreateFolderRequest {
                    parent_path: None,
                    name: "Docs".into(),
                },
            )
            .await
            .unwrap();
        let archive = folders
            .create_folder(
                owner,
                CreateFolderRequest {
                    parent_path: None,
                    name: "Archive".into(),
                },
            )
            .await
            .unwrap();
        let root = index.ensure_root(owner).await.unwrap();
        index
            .append_node(owner, docs.id, CreateNode::file("a.txt", "blobs/a", None, 1))
            .await
            .unwrap();

        let moved = folders
            .move_node(
                owner,
                MoveNodeRequest {
                    id: docs.id,
                    new_parent_path: Some("/Archive".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.path, "/Archive/Docs");
        assert_eq!(moved.parent_id, Some(archive.id));

        let file = index
            .find_by_path(owner, "/Archive/Docs/a.txt")
            .await
            .unwrap();
        assert!(file.is_some());
        assert!(index.find_by_path(owner, "/Docs").await.unwrap().is_none());
        assert_eq!(index.children(owner, root.id).await.unwrap().len(), 1);
        index.verify(owner).await.unwrap();
    }

    #[tokio::test]
    async fn test_move_into_own_subtree_is_a_cycle() {
        let (folders, _index, owner) = service();
        let docs = folders
            .create_folder(
                owner,
                CreateFolderRequest {
                    parent_path: None,
                    name: "Docs".into(),
                },
            )
            .await
            .unwrap();
        folders
            .create_folder(
                owner,
                CreateFolderRequest {
                    parent_path: Some("/Docs".into()),
                    name: "Sub".into(),
                },
            )
            .await
            .unwrap();

        let err = folders
            .move_node(
                owner,
                MoveNodeRequest {
                    id: docs.id,
                    new_parent_path: Some("/Docs/Sub".into()),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cycle);
    }

    #[tokio::test]
    async fn test_move_trashed_item_is_rejected() {
        let (folders, index, owner) = service();
        let docs = folders
            .create_folder(
                owner,
                CreateFolderRequest {
                    parent_path: None,
                    name: "Docs".into(),
                },
            )
            .await
            .unwrap();
        index
            .set_deleted(owner, &[docs.id], Some(chrono::Utc::now()))
            .await
            .unwrap();

        let err = folders
            .move_node(
                owner,
                MoveNodeRequest {
                    id: docs.id,
                    new_parent_path: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
