//! Owner-keyed async store over [`Forest`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use drivebox_core::result::AppResult;
use drivebox_entity::{CreateNode, Node};

use crate::forest::Forest;

/// The tree index: one [`Forest`] per owner behind a read/write lock.
///
/// Mutations take the owner's write guard, queries the read guard. None of
/// the guarded sections contain an await point, so every mutation is one
/// atomic unit even when the calling task is cancelled. Operations on
/// different owners never contend.
#[derive(Debug, Clone, Default)]
pub struct TreeIndex {
    forests: Arc<DashMap<Uuid, Arc<RwLock<Forest>>>>,
}

impl TreeIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or lazily create the owner's forest.
    fn forest(&self, owner_id: Uuid) -> Arc<RwLock<Forest>> {
        self.forests
            .entry(owner_id)
            .or_insert_with(|| Arc::new(RwLock::new(Forest::new(owner_id))))
            .clone()
    }

    /// Return the owner's root folder, creating the forest on first use.
    pub async fn ensure_root(&self, owner_id: Uuid) -> AppResult<Node> {
        let forest = self.forest(owner_id);
        let guard = forest.read().await;
        Ok(guard.root().clone())
    }

    /// Append a new node as the last child of `parent_id`.
    pub async fn append_node(
        &self,
        owner_id: Uuid,
        parent_id: Uuid,
        payload: CreateNode,
    ) -> AppResult<Node> {
        let forest = self.forest(owner_id);
        let mut guard = forest.write().await;
        let node = guard.append(parent_id, payload)?;
        debug!(
            owner_id = %owner_id,
            node_id = %node.id,
            path = %node.path,
            "Appended node"
        );
        Ok(node)
    }

    /// The subtree rooted at `id`, ordered by `lft`, the node itself first.
    pub async fn subtree(&self, owner_id: Uuid, id: Uuid) -> AppResult<Vec<Node>> {
        let forest = self.forest(owner_id);
        let guard = forest.read().await;
        guard.subtree(id)
    }

    /// The strict ancestors of `id`, root first.
    pub async fn ancestors(&self, owner_id: Uuid, id: Uuid) -> AppResult<Vec<Node>> {
        let forest = self.forest(owner_id);
        let guard = forest.read().await;
        guard.ancestors(id)
    }

    /// The direct children of `id` in insertion order.
    pub async fn children(&self, owner_id: Uuid, id: Uuid) -> AppResult<Vec<Node>> {
        let forest = self.forest(owner_id);
        let guard = forest.read().await;
        guard.children(id)
    }

    /// Point lookup by id.
    pub async fn find(&self, owner_id: Uuid, id: Uuid) -> AppResult<Option<Node>> {
        let forest = self.forest(owner_id);
        let guard = forest.read().await;
        Ok(guard.get(id).cloned())
    }

    /// Point lookup by materialized path.
    pub async fn find_by_path(&self, owner_id: Uuid, path: &str) -> AppResult<Option<Node>> {
        let forest = self.forest(owner_id);
        let guard = forest.read().await;
        Ok(guard.get_by_path(path).cloned())
    }

    /// Remove the subtree rooted at `id` and return the removed nodes.
    pub async fn detach(&self, owner_id: Uuid, id: Uuid) -> AppResult<Vec<Node>> {
        let forest = self.forest(owner_id);
        let mut guard = forest.write().await;
        let removed = guard.detach(id)?;
        debug!(
            owner_id = %owner_id,
            node_id = %id,
            removed = removed.len(),
            "Detached subtree"
        );
        Ok(removed)
    }

    /// Move the subtree rooted at `id` under `new_parent_id`.
    pub async fn move_node(
        &self,
        owner_id: Uuid,
        id: Uuid,
        new_parent_id: Uuid,
    ) -> AppResult<Node> {
        let forest = self.forest(owner_id);
        let mut guard = forest.write().await;
        let node = guard.move_node(id, new_parent_id)?;
        debug!(
            owner_id = %owner_id,
            node_id = %id,
            new_parent_id = %new_parent_id,
            path = %node.path,
            "Moved node"
        );
        Ok(node)
    }

    /// Stamp or clear the trashed flag on the given nodes.
    pub async fn set_deleted(
        &self,
        owner_id: Uuid,
        ids: &[Uuid],
        deleted_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        let forest = self.forest(owner_id);
        let mut guard = forest.write().await;
        guard.set_deleted(ids, deleted_at)?;
        debug!(
            owner_id = %owner_id,
            count = ids.len(),
            trashed = deleted_at.is_some(),
            "Stamped trash flag"
        );
        Ok(())
    }

    /// Audit the owner's forest against the nested-set invariants.
    pub async fn verify(&self, owner_id: Uuid) -> AppResult<()> {
        let forest = self.forest(owner_id);
        let guard = forest.read().await;
        guard.verify()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_root_is_idempotent() {
        let index = TreeIndex::new();
        let owner = Uuid::new_v4();
        let first = index.ensure_root(owner).await.unwrap();
        let second = index.ensure_root(owner).await.unwrap();
        assert_eq!(first.id, second.id);
        index.verify(owner).await.unwrap();
    }

    #[tokio::test]
    async fn test_owners_are_isolated() {
        let index = TreeIndex::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let alice_root = index.ensure_root(alice).await.unwrap();
        let bob_root = index.ensure_root(bob).await.unwrap();

        // Identical names in both forests, no conflict.
        let a = index
            .append_node(alice, alice_root.id, CreateNode::folder("Docs"))
            .await
            .unwrap();
        index
            .append_node(bob, bob_root.id, CreateNode::folder("Docs"))
            .await
            .unwrap();

        let found = index.find_by_path(alice, "/Docs").await.unwrap().unwrap();
        assert_eq!(found.id, a.id);
        assert_eq!(found.owner_id, alice);
        // Alice's node is invisible in Bob's forest.
        assert!(index.find(bob, a.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_appends_serialize() {
        let index = TreeIndex::new();
        let owner = Uuid::new_v4();
        let root = index.ensure_root(owner).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..10 {
            let index = index.clone();
            let root_id = root.id;
            handles.push(tokio::spawn(async move {
                index
                    .append_node(owner, root_id, CreateNode::folder(format!("f{i}")))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let children = index.children(owner, root.id).await.unwrap();
        assert_eq!(children.len(), 10);
        index.verify(owner).await.unwrap();
    }

    #[tokio::test]
    async fn test_detach_through_the_store() {
        let index = TreeIndex::new();
        let owner = Uuid::new_v4();
        let root = index.ensure_root(owner).await.unwrap();
        let docs = index
            .append_node(owner, root.id, CreateNode::folder("Docs"))
            .await
            .unwrap();
        index
            .append_node(owner, docs.id, CreateNode::file("a.txt", "blobs/a", None, 1))
            .await
            .unwrap();

        let removed = index.detach(owner, docs.id).await.unwrap();
        assert_eq!(removed.len(), 2);
        assert!(index.find(owner, docs.id).await.unwrap().is_none());
        index.verify(owner).await.unwrap();
    }
}
