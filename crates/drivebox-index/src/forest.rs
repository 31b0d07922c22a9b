//! Nested-set forest for a single owner.
//!
//! Every node carries a `[lft, rgt]` bound pair. Across one owner's forest
//! the bound values are exactly the sequence `1..=2n`, the root spans the
//! whole range, and the direct children of any folder tile the open
//! interval between its bounds with no gaps and no overlaps. Subtree and
//! ancestor queries are therefore pure range scans.
//!
//! All methods are synchronous. Callers hold the owner's forest lock (see
//! [`crate::store::TreeIndex`]), so a mutation can never be observed
//! half-applied: every method validates first and only then rewrites
//! bounds.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use drivebox_core::error::AppError;
use drivebox_core::result::AppResult;
use drivebox_entity::{CreateNode, Node};

/// Name given to the lazily created per-owner root folder.
pub const ROOT_NAME: &str = "files";

/// Build a child path from its parent's path and own name.
fn join_path(parent_path: &str, name: &str) -> String {
    format!("{parent_path}/{name}")
}

/// One owner's node tree.
///
/// Holds the plain node table plus a `path -> id` map used for uniqueness
/// checks and path lookups. Only this type writes `lft`, `rgt`,
/// `parent_id`, or `path`.
#[derive(Debug)]
pub struct Forest {
    /// The owner whose nodes this forest holds.
    owner_id: Uuid,
    /// All nodes, root included, keyed by id.
    nodes: HashMap<Uuid, Node>,
    /// Materialized path to node id, one entry per node.
    paths: HashMap<String, Uuid>,
    /// Id of the root node.
    root_id: Uuid,
}

impl Forest {
    /// Create a fresh forest containing only the owner's root folder.
    ///
    /// The root is named [`ROOT_NAME`], has the empty path, and spans
    /// `[1, 2]` until children arrive.
    pub fn new(owner_id: Uuid) -> Self {
        let now = Utc::now();
        let root = Node {
            id: Uuid::new_v4(),
            owner_id,
            parent_id: None,
            name: ROOT_NAME.to_string(),
            path: String::new(),
            is_folder: true,
            lft: 1,
            rgt: 2,
            storage_path: None,
            mime_type: None,
            size_bytes: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let root_id = root.id;
        let mut nodes = HashMap::new();
        let mut paths = HashMap::new();
        paths.insert(root.path.clone(), root_id);
        nodes.insert(root_id, root);
        Self {
            owner_id,
            nodes,
            paths,
            root_id,
        }
    }

    /// The owner this forest belongs to.
    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    /// The root node.
    pub fn root(&self) -> &Node {
        // The root is inserted in `new` and can never be detached.
        &self.nodes[&self.root_id]
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the forest holds only the root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Look up a node by id.
    pub fn get(&self, id: Uuid) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Look up a node by materialized path.
    pub fn get_by_path(&self, path: &str) -> Option<&Node> {
        self.paths.get(path).and_then(|id| self.nodes.get(id))
    }

    fn require(&self, id: Uuid) -> AppResult<&Node> {
        self.nodes
            .get(&id)
            .ok_or_else(|| AppError::not_found("Node not found"))
    }

    /// Append a new node as the last child of `parent_id`.
    ///
    /// With `r = parent.rgt`, every `lft >= r` and every `rgt >= r` in the
    /// forest moves up by 2, then the new node lands on `[r, r + 1]`. The
    /// parent keeps its `lft`, grows its `rgt`, and all prior children are
    /// untouched, so insertion order is preserved.
    pub fn append(&mut self, parent_id: Uuid, payload: CreateNode) -> AppResult<Node> {
        if payload.name.is_empty() {
            return Err(AppError::validation("Name cannot be empty"));
        }
        if payload.name.contains('/') {
            return Err(AppError::validation("Name cannot contain '/'"));
        }
        let parent = self.require(parent_id)?;
        if !parent.is_folder {
            return Err(AppError::validation("Parent is not a folder"));
        }
        let path = join_path(&parent.path, &payload.name);
        if self.paths.contains_key(&path) {
            return Err(AppError::conflict(format!(
                "'{}' already exists in this folder",
                payload.name
            )));
        }
        let r = parent.rgt;

        for node in self.nodes.values_mut() {
            if node.lft >= r {
                node.lft += 2;
            }
            if node.rgt >= r {
                node.rgt += 2;
            }
        }

        let now = Utc::now();
        let node = Node {
            id: Uuid::new_v4(),
            owner_id: self.owner_id,
            parent_id: Some(parent_id),
            name: payload.name,
            path: path.clone(),
            is_folder: payload.is_folder,
            lft: r,
            rgt: r + 1,
            storage_path: payload.storage_path,
            mime_type: payload.mime_type,
            size_bytes: payload.size_bytes,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.paths.insert(path, node.id);
        self.nodes.insert(node.id, node.clone());
        Ok(node)
    }

    /// All nodes of the subtree rooted at `id`, ordered by `lft` ascending.
    /// The node itself comes first.
    pub fn subtree(&self, id: Uuid) -> AppResult<Vec<Node>> {
        let node = self.require(id)?;
        let (lo, hi) = (node.lft, node.rgt);
        let mut out: Vec<Node> = self
            .nodes
            .values()
            .filter(|n| n.lft >= lo && n.rgt <= hi)
            .cloned()
            .collect();
        out.sort_by_key(|n| n.lft);
        Ok(out)
    }

    /// All strict ancestors of `id`, ordered by `lft` ascending (root
    /// first).
    pub fn ancestors(&self, id: Uuid) -> AppResult<Vec<Node>> {
        let node = self.require(id)?;
        let (lo, hi) = (node.lft, node.rgt);
        let mut out: Vec<Node> = self
            .nodes
            .values()
            .filter(|n| n.lft < lo && n.rgt > hi)
            .cloned()
            .collect();
        out.sort_by_key(|n| n.lft);
        Ok(out)
    }

    /// Direct children of `id`, ordered by `lft` ascending (insertion
    /// order).
    pub fn children(&self, id: Uuid) -> AppResult<Vec<Node>> {
        self.require(id)?;
        let mut out: Vec<Node> = self
            .nodes
            .values()
            .filter(|n| n.parent_id == Some(id))
            .cloned()
            .collect();
        out.sort_by_key(|n| n.lft);
        Ok(out)
    }

    /// Remove the subtree rooted at `id` and compact the freed bound range.
    ///
    /// Every remaining node with bounds above the removed range shifts down
    /// by the subtree width (`2 * removed_count`). Returns the removed
    /// nodes ordered by `lft`. The bound census of the subtree is checked
    /// before anything is touched; a mismatch aborts with `TreeCorruption`
    /// and commits nothing.
    pub fn detach(&mut self, id: Uuid) -> AppResult<Vec<Node>> {
        let node = self.require(id)?;
        if node.is_root() {
            return Err(AppError::validation("Cannot remove the root folder"));
        }
        let (lo, hi) = (node.lft, node.rgt);
        let name = node.name.clone();
        let removed_ids: Vec<Uuid> = self
            .nodes
            .values()
            .filter(|n| n.lft >= lo && n.rgt <= hi)
            .map(|n| n.id)
            .collect();
        let width = hi - lo + 1;
        if removed_ids.len() as i64 * 2 != width {
            return Err(AppError::tree_corruption(format!(
                "Bound census mismatch under '{name}': {} nodes inside [{lo}, {hi}]",
                removed_ids.len()
            )));
        }

        let mut removed: Vec<Node> = Vec::with_capacity(removed_ids.len());
        for rid in &removed_ids {
            if let Some(n) = self.nodes.remove(rid) {
                self.paths.remove(&n.path);
                removed.push(n);
            }
        }
        for n in self.nodes.values_mut() {
            if n.lft > hi {
                n.lft -= width;
            }
            if n.rgt > hi {
                n.rgt -= width;
            }
        }
        removed.sort_by_key(|n| n.lft);
        Ok(removed)
    }

    /// Move the subtree rooted at `id` to become the last child of
    /// `new_parent_id`, rewriting bounds and materialized paths.
    ///
    /// Proceeds in three bound passes over the non-members: close the old
    /// gap, open a gap at the destination tail, then translate the subtree
    /// into the gap. All validation happens before the first pass.
    pub fn move_node(&mut self, id: Uuid, new_parent_id: Uuid) -> AppResult<Node> {
        let node = self.require(id)?;
        if node.is_root() {
            return Err(AppError::validation("Cannot move the root folder"));
        }
        let (old_lft, old_rgt) = (node.lft, node.rgt);
        let old_path = node.path.clone();
        let name = node.name.clone();

        let parent = self.require(new_parent_id)?;
        if !parent.is_folder {
            return Err(AppError::validation("Destination is not a folder"));
        }
        if old_lft <= parent.lft && parent.rgt <= old_rgt {
            return Err(AppError::cycle(
                "Cannot move a folder into itself or its own subtree",
            ));
        }
        let new_path = join_path(&parent.path, &name);
        if let Some(&holder) = self.paths.get(&new_path) {
            if holder != id {
                return Err(AppError::conflict(format!(
                    "'{name}' already exists in the destination folder"
                )));
            }
        }

        let width = old_rgt - old_lft + 1;
        let member_ids: Vec<Uuid> = self
            .nodes
            .values()
            .filter(|n| n.lft >= old_lft && n.rgt <= old_rgt)
            .map(|n| n.id)
            .collect();
        if member_ids.len() as i64 * 2 != width {
            return Err(AppError::tree_corruption(format!(
                "Bound census mismatch under '{name}': {} nodes inside [{old_lft}, {old_rgt}]",
                member_ids.len()
            )));
        }
        let members: HashSet<Uuid> = member_ids.iter().copied().collect();
        // The destination's rgt once the old gap is closed. The cycle check
        // above guarantees the destination is not a member, so only the
        // downward shift can apply to it.
        let gap_at = if parent.rgt > old_rgt {
            parent.rgt - width
        } else {
            parent.rgt
        };

        for n in self.nodes.values_mut() {
            if members.contains(&n.id) {
                continue;
            }
            if n.lft > old_rgt {
                n.lft -= width;
            }
            if n.rgt > old_rgt {
                n.rgt -= width;
            }
        }
        for n in self.nodes.values_mut() {
            if members.contains(&n.id) {
                continue;
            }
            if n.lft >= gap_at {
                n.lft += width;
            }
            if n.rgt >= gap_at {
                n.rgt += width;
            }
        }

        // Member bounds still hold their original values, so one delta
        // lands the whole subtree in the gap with its shape intact.
        let delta = gap_at - old_lft;
        let now = Utc::now();
        for mid in &member_ids {
            let Some(n) = self.nodes.get_mut(mid) else {
                continue;
            };
            n.lft += delta;
            n.rgt += delta;
            let suffix = n.path[old_path.len()..].to_string();
            let fresh = format!("{new_path}{suffix}");
            self.paths.remove(&n.path);
            n.path = fresh.clone();
            n.updated_at = now;
            self.paths.insert(fresh, *mid);
        }
        if let Some(n) = self.nodes.get_mut(&id) {
            n.parent_id = Some(new_parent_id);
        }

        self.nodes
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::internal("Node disappeared during move"))
    }

    /// Stamp or clear the trashed flag on the given nodes. Bounds are never
    /// touched. All ids are checked up front; an unknown id fails the whole
    /// call without stamping anything.
    pub fn set_deleted(
        &mut self,
        ids: &[Uuid],
        deleted_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        for id in ids {
            if !self.nodes.contains_key(id) {
                return Err(AppError::not_found("Node not found"));
            }
        }
        let now = Utc::now();
        for id in ids {
            if let Some(n) = self.nodes.get_mut(id) {
                n.deleted_at = deleted_at;
                n.updated_at = now;
            }
        }
        Ok(())
    }

    /// Audit the whole forest against the nested-set invariants.
    ///
    /// Checks, in order: root spans `[1, 2n]`; every node has `lft < rgt`;
    /// files are leaves; the bound values are exactly `1..=2n`; the
    /// children of every folder tile its open interval in `lft` order with
    /// consistent `parent_id` and materialized paths. The first violation
    /// is reported as `TreeCorruption` naming the offending node.
    pub fn verify(&self) -> AppResult<()> {
        let n = self.nodes.len() as i64;
        let root = self
            .nodes
            .get(&self.root_id)
            .ok_or_else(|| AppError::tree_corruption("Root node is missing"))?;
        if root.lft != 1 || root.rgt != 2 * n {
            return Err(AppError::tree_corruption(format!(
                "Root bounds [{}, {}] do not span the {n}-node forest",
                root.lft, root.rgt
            )));
        }

        let mut bounds = Vec::with_capacity(self.nodes.len() * 2);
        for node in self.nodes.values() {
            if node.lft >= node.rgt {
                return Err(AppError::tree_corruption(format!(
                    "'{}' has inverted bounds [{}, {}]",
                    node.name, node.lft, node.rgt
                )));
            }
            if !node.is_folder && node.rgt != node.lft + 1 {
                return Err(AppError::tree_corruption(format!(
                    "File '{}' has subtree bounds [{}, {}]",
                    node.name, node.lft, node.rgt
                )));
            }
            bounds.push(node.lft);
            bounds.push(node.rgt);
        }
        bounds.sort_unstable();
        for (i, bound) in bounds.iter().enumerate() {
            if *bound != i as i64 + 1 {
                return Err(AppError::tree_corruption(format!(
                    "Bound values are not the exact sequence 1..={}",
                    2 * n
                )));
            }
        }

        for parent in self.nodes.values().filter(|p| p.is_folder) {
            let mut children: Vec<&Node> = self
                .nodes
                .values()
                .filter(|c| c.parent_id == Some(parent.id))
                .collect();
            children.sort_by_key(|c| c.lft);
            let mut cursor = parent.lft + 1;
            for child in &children {
                if child.lft != cursor {
                    return Err(AppError::tree_corruption(format!(
                        "Children of '{}' leave a gap before '{}'",
                        parent.name, child.name
                    )));
                }
                if child.path != join_path(&parent.path, &child.name) {
                    return Err(AppError::tree_corruption(format!(
                        "'{}' has a stale path '{}'",
                        child.name, child.path
                    )));
                }
                cursor = child.rgt + 1;
            }
            if cursor != parent.rgt {
                return Err(AppError::tree_corruption(format!(
                    "Children of '{}' do not tile its interval",
                    parent.name
                )));
            }
        }

        for node in self.nodes.values() {
            match node.parent_id {
                Some(pid) => match self.nodes.get(&pid) {
                    Some(p) if p.is_folder => {}
                    Some(p) => {
                        return Err(AppError::tree_corruption(format!(
                            "'{}' is parented to file '{}'",
                            node.name, p.name
                        )));
                    }
                    None => {
                        return Err(AppError::tree_corruption(format!(
                            "'{}' has a dangling parent id",
                            node.name
                        )));
                    }
                },
                None if node.id == self.root_id => {}
                None => {
                    return Err(AppError::tree_corruption(format!(
                        "'{}' is a second root",
                        node.name
                    )));
                }
            }
        }

        if self.paths.len() != self.nodes.len() {
            return Err(AppError::tree_corruption(
                "Path map does not match the node table",
            ));
        }
        Ok(())
    }
}
