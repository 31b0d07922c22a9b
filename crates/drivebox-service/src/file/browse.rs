//! Folder content listing, search, trash listing, and breadcrumbs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use drivebox_core::types::{PageRequest, PageResponse};
use drivebox_core::{AppError, AppResult};
use drivebox_entity::node::Node;
use drivebox_index::TreeIndex;

use crate::selection::{normalize_path, resolve_parent_folder, trash_roots};

/// Request for listing folder contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListRequest {
    /// Folder to list. Empty or absent targets the root folder.
    #[serde(default)]
    pub folder_path: Option<String>,
    /// Optional name filter. When present the whole active tree is
    /// scanned instead of one folder.
    #[serde(default)]
    pub search: Option<String>,
    /// Page window.
    #[serde(default)]
    pub page: PageRequest,
}

/// Read-side service over the node tree.
#[derive(Debug, Clone)]
pub struct BrowseService {
    index: Arc<TreeIndex>,
}

impl BrowseService {
    /// Creates a new browse service.
    pub fn new(index: Arc<TreeIndex>) -> Self {
        Self { index }
    }

    /// Lists a folder's active children, or searches the whole tree.
    ///
    /// Trashed nodes never appear. Folders sort before files, newest
    /// first within each group, matching what a drive UI shows.
    pub async fn list_children(
        &self,
        owner_id: Uuid,
        request: ListRequest,
    ) -> AppResult<PageResponse<Node>> {
        let query = request
            .search
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty());

        let mut nodes = match query {
            Some(query) => {
                let root = self.index.ensure_root(owner_id).await?;
                let needle = query.to_lowercase();
                self.index
                    .subtree(owner_id, root.id)
                    .await?
                    .into_iter()
                    .filter(|n| !n.is_root() && n.is_active())
                    .filter(|n| n.name.to_lowercase().contains(&needle))
                    .collect::<Vec<_>>()
            }
            None => {
                let folder =
                    resolve_parent_folder(&self.index, owner_id, request.folder_path.as_deref())
                        .await?;
                self.index
                    .children(owner_id, folder.id)
                    .await?
                    .into_iter()
                    .filter(Node::is_active)
                    .collect()
            }
        };

        nodes.sort_by(|a, b| {
            b.is_folder
                .cmp(&a.is_folder)
                .then(b.created_at.cmp(&a.created_at))
                .then(b.lft.cmp(&a.lft))
        });
        Ok(PageResponse::paged(nodes, &request.page))
    }

    /// Lists the trash: trashed nodes whose parent is still active,
    /// most recently trashed first.
    ///
    /// Descendants trashed by a cascade stay hidden behind their trashed
    /// ancestor, so the trash page shows each removal once.
    pub async fn list_trash(
        &self,
        owner_id: Uuid,
        page: PageRequest,
    ) -> AppResult<PageResponse<Node>> {
        let mut roots = trash_roots(&self.index, owner_id).await?;
        roots.sort_by(|a, b| {
            b.deleted_at
                .cmp(&a.deleted_at)
                .then(b.lft.cmp(&a.lft))
        });
        Ok(PageResponse::paged(roots, &page))
    }

    /// The breadcrumb chain for a folder: root first, the folder last.
    pub async fn ancestors(&self, owner_id: Uuid, folder_path: &str) -> AppResult<Vec<Node>> {
        let path = normalize_path(folder_path);
        if path.is_empty() {
            return Ok(vec![self.index.ensure_root(owner_id).await?]);
        }

        let node = self
            .index
            .find_by_path(owner_id, &path)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder not found: {path}")))?;
        let mut chain = self.index.ancestors(owner_id, node.id).await?;
        chain.push(node);
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use drivebox_entity::node::CreateNode;

    async fn seeded() -> (BrowseService, Arc<TreeIndex>, Uuid) {
        let index = Arc::new(TreeIndex::new());
        let owner = Uuid::new_v4();
        let root = index.ensure_root(owner).await.unwrap();
        let docs = index
            .append_node(owner, root.id, CreateNode::folder("Docs"))
            .await
            .unwrap();
        index
            .append_node(owner, root.id, CreateNode::file("notes.txt", "blobs/n", None, 2))
            .await
            .unwrap();
        index
            .append_node(owner, docs.id, CreateNode::file("report.pdf", "blobs/r", None, 9))
            .await
            .unwrap();
        (BrowseService::new(index.clone()), index, owner)
    }

    #[tokio::test]
    async fn test_listing_orders_folders_first() {
        let (browse, _, owner) = seeded().await;
        let page = browse
            .list_children(owner, ListRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_items, 2);
        assert_eq!(page.items[0].name, "Docs");
        assert_eq!(page.items[1].name, "notes.txt");
    }

    #[tokio::test]
    async fn test_listing_hides_trashed_nodes() {
        let (browse, index, owner) = seeded().await;
        let notes = index.find_by_path(owner, "/notes.txt").await.unwrap().unwrap();
        index
            .set_deleted(owner, &[notes.id], Some(Utc::now()))
            .await
            .unwrap();

        let page = browse
            .list_children(owner, ListRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].name, "Docs");
    }

    #[tokio::test]
    async fn test_search_scans_the_whole_tree() {
        let (browse, _, owner) = seeded().await;
        let page = browse
            .list_children(
                owner,
                ListRequest {
                    search: Some("RePoRt".into()),
                    ..ListRequest::default()
                },
            )
            .await
            .unwrap();
        // report.pdf sits inside /Docs but search still finds it.
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].path, "/Docs/report.pdf");
    }

    #[tokio::test]
    async fn test_pagination_windows() {
        let index = Arc::new(TreeIndex::new());
        let owner = Uuid::new_v4();
        let root = index.ensure_root(owner).await.unwrap();
        for i in 0..25 {
            index
                .append_node(
                    owner,
                    root.id,
                    CreateNode::file(format!("f{i:02}.txt"), format!("blobs/{i}"), None, 1),
                )
                .await
                .unwrap();
        }
        let browse = BrowseService::new(index);

        let page = browse
            .list_children(
                owner,
                ListRequest {
                    page: PageRequest::new(3, 10),
                    ..ListRequest::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total_items, 25);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 5);
        assert!(!page.has_next);
        assert!(page.has_previous);
    }

    #[tokio::test]
    async fn test_trash_lists_only_trash_roots() {
        let (browse, index, owner) = seeded().await;
        let docs = index.find_by_path(owner, "/Docs").await.unwrap().unwrap();
        let members = index.subtree(owner, docs.id).await.unwrap();
        let ids: Vec<Uuid> = members.iter().map(|n| n.id).collect();
        index
            .set_deleted(owner, &ids, Some(Utc::now()))
            .await
            .unwrap();

        let page = browse.list_trash(owner, PageRequest::default()).await.unwrap();
        // Docs went to trash with report.pdf inside; only Docs is shown.
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].name, "Docs");
    }

    #[tokio::test]
    async fn test_breadcrumbs_run_root_to_folder() {
        let (browse, index, owner) = seeded().await;
        let root = index.ensure_root(owner).await.unwrap();
        index
            .append_node(
                owner,
                index.find_by_path(owner, "/Docs").await.unwrap().unwrap().id,
                CreateNode::folder("Sub"),
            )
            .await
            .unwrap();

        let chain = browse.ancestors(owner, "/Docs/Sub").await.unwrap();
        let names: Vec<&str> = chain.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["files", "Docs", "Sub"]);
        assert_eq!(chain[0].id, root.id);

        let just_root = browse.ancestors(owner, "").await.unwrap();
        assert_eq!(just_root.len(), 1);
    }
}
