//! Node selection payloads shared by trash and download operations.

use std::collections::HashMap;

use drivebox_core::{AppError, AppResult};
use drivebox_entity::node::Node;
use drivebox_index::TreeIndex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Selects the nodes an operation applies to.
///
/// Either `all` is set and the operation targets every direct child of
/// `parent_path`, or `ids` lists the target nodes explicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeSelection {
    /// Apply to all children of `parent_path` instead of listing ids.
    #[serde(default)]
    pub all: bool,
    /// Folder the `all` flag is scoped to. Empty or absent means the
    /// owner's root folder.
    #[serde(default)]
    pub parent_path: Option<String>,
    /// Explicit target node ids. Ignored when `all` is set.
    #[serde(default)]
    pub ids: Vec<Uuid>,
}

impl NodeSelection {
    /// Selects every child of the given folder.
    pub fn all_under(parent_path: impl Into<String>) -> Self {
        Self {
            all: true,
            parent_path: Some(parent_path.into()),
            ids: Vec::new(),
        }
    }

    /// Selects every child of the owner's root folder.
    pub fn all_root() -> Self {
        Self {
            all: true,
            parent_path: None,
            ids: Vec::new(),
        }
    }

    /// Selects the given nodes explicitly.
    pub fn of_ids(ids: impl Into<Vec<Uuid>>) -> Self {
        Self {
            all: false,
            parent_path: None,
            ids: ids.into(),
        }
    }

    /// True when the selection names nothing at all.
    pub fn is_empty_request(&self) -> bool {
        !self.all && self.ids.is_empty()
    }
}

/// Normalizes a user-supplied folder path to the internal form.
///
/// Internal paths are `""` for the root and `/a/b` below it. Trailing
/// slashes are dropped and a missing leading slash is added.
pub(crate) fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Resolves a folder path to its active folder node.
///
/// `None` or an empty path resolves to the owner's root folder,
/// creating it if this owner has no tree yet.
pub(crate) async fn resolve_parent_folder(
    index: &TreeIndex,
    owner_id: Uuid,
    parent_path: Option<&str>,
) -> AppResult<Node> {
    let path = normalize_path(parent_path.unwrap_or(""));
    if path.is_empty() {
        return index.ensure_root(owner_id).await;
    }

    let node = index
        .find_by_path(owner_id, &path)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Folder not found: {path}")))?;

    if !node.is_folder {
        return Err(AppError::validation(format!(
            "'{}' is not a folder",
            node.name
        )));
    }
    if node.is_trashed() {
        return Err(AppError::validation(format!(
            "Folder '{}' is in the trash",
            node.name
        )));
    }
    Ok(node)
}

/// The owner's trash roots: trashed nodes whose parent is still active,
/// in tree order.
///
/// Nodes trashed as part of a cascade stay hidden behind their trashed
/// ancestor, so each removal surfaces exactly once.
pub(crate) async fn trash_roots(index: &TreeIndex, owner_id: Uuid) -> AppResult<Vec<Node>> {
    let root = index.ensure_root(owner_id).await?;
    let all = index.subtree(owner_id, root.id).await?;
    let by_id: HashMap<Uuid, &Node> = all.iter().map(|n| (n.id, n)).collect();
    Ok(all
        .iter()
        .filter(|n| n.is_trashed())
        .filter(|n| match n.parent_id.and_then(|pid| by_id.get(&pid)) {
            Some(parent) => parent.is_active(),
            None => true,
        })
        .cloned()
        .collect())
}
