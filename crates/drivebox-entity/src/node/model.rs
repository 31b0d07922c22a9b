//! Node entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single entry in an owner's file tree: either a folder or a file.
///
/// Nodes carry nested-set bounds (`lft`, `rgt`): a node's subtree is
/// exactly the set of nodes whose bounds fall inside its own, so subtree
/// and ancestor queries are range scans with no recursion. Bounds are
/// maintained exclusively by the tree index; nothing else may write them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique node identifier.
    pub id: Uuid,
    /// The owner of this node. Every query and mutation is scoped to one
    /// owner; nodes of different owners never interact.
    pub owner_id: Uuid,
    /// The containing folder. `None` only for the per-owner root.
    pub parent_id: Option<Uuid>,
    /// The node name (for files, including extension).
    pub name: String,
    /// Materialized path, unique per owner. The root's path is `""`; a
    /// child's path is `{parent.path}/{name}`.
    pub path: String,
    /// Whether this node is a folder.
    pub is_folder: bool,
    /// Nested-set left bound.
    pub lft: i64,
    /// Nested-set right bound. Always `> lft`; leaves have `rgt == lft + 1`.
    pub rgt: i64,
    /// The blob store path of the content. `Some` only for files.
    pub storage_path: Option<String>,
    /// MIME type of the content, if known.
    pub mime_type: Option<String>,
    /// Content size in bytes. Zero for folders.
    pub size_bytes: i64,
    /// When the node was created.
    pub created_at: DateTime<Utc>,
    /// When the node was last updated.
    pub updated_at: DateTime<Utc>,
    /// When the node was moved to trash. `None` means the node is active.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Node {
    /// Whether the node is active (not in trash).
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Whether the node is in trash.
    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether this is the per-owner root node.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Whether `other` lies inside this node's subtree (self included).
    pub fn contains(&self, other: &Node) -> bool {
        self.lft <= other.lft && other.rgt <= self.rgt
    }

    /// Get the file extension (lowercase), if any.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit('.')
            .next()
            .filter(|ext| *ext != self.name)
            .map(|ext| ext.to_lowercase())
    }
}

/// Data required to create a new node. Bounds, path, and timestamps are
/// assigned by the tree index on insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNode {
    /// The node name.
    pub name: String,
    /// Whether the node is a folder.
    pub is_folder: bool,
    /// The blob store path of the content (files only).
    pub storage_path: Option<String>,
    /// MIME type of the content, if known.
    pub mime_type: Option<String>,
    /// Content size in bytes.
    pub size_bytes: i64,
}

impl CreateNode {
    /// Shorthand for a folder creation payload.
    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_folder: true,
            storage_path: None,
            mime_type: None,
            size_bytes: 0,
        }
    }

    /// Shorthand for a file creation payload.
    pub fn file(
        name: impl Into<String>,
        storage_path: impl Into<String>,
        mime_type: Option<String>,
        size_bytes: i64,
    ) -> Self {
        Self {
            name: name.into(),
            is_folder: false,
            storage_path: Some(storage_path.into()),
            mime_type,
            size_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str, lft: i64, rgt: i64) -> Node {
        let now = Utc::now();
        Node {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            parent_id: Some(Uuid::new_v4()),
            name: name.to_string(),
            path: format!("/{name}"),
            is_folder: false,
            lft,
            rgt,
            storage_path: None,
            mime_type: None,
            size_bytes: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_extension() {
        assert_eq!(sample("report.PDF", 2, 3).extension(), Some("pdf".into()));
        assert_eq!(sample("archive.tar.gz", 2, 3).extension(), Some("gz".into()));
        assert_eq!(sample("README", 2, 3).extension(), None);
    }

    #[test]
    fn test_contains_uses_bounds() {
        let parent = sample("docs", 2, 9);
        let child = sample("a.txt", 3, 4);
        let sibling = sample("other", 10, 11);
        assert!(parent.contains(&child));
        assert!(parent.contains(&parent));
        assert!(!parent.contains(&sibling));
        assert!(!child.contains(&parent));
    }

    #[test]
    fn test_trash_state() {
        let mut node = sample("a.txt", 2, 3);
        assert!(node.is_active());
        node.deleted_at = Some(Utc::now());
        assert!(node.is_trashed());
        assert!(!node.is_active());
    }
}
