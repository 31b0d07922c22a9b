//! ZIP archive assembly for multi-node downloads.

use std::io::{Cursor, Write};
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;
use uuid::Uuid;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

use drivebox_core::config::ArchiveConfig;
use drivebox_core::error::ErrorKind;
use drivebox_core::traits::BlobStore;
use drivebox_core::{AppError, AppResult};
use drivebox_entity::node::Node;
use drivebox_index::TreeIndex;

/// Builds ZIP archives from node subtrees.
///
/// Entry paths inside the archive mirror the tree below the selected
/// nodes: a folder `Docs` containing `a.txt` and `Sub/b.txt` yields the
/// entries `Docs/`, `Docs/a.txt`, `Docs/Sub/` and `Docs/Sub/b.txt`.
/// Trashed descendants are skipped.
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    index: Arc<TreeIndex>,
    blob_store: Arc<dyn BlobStore>,
    config: ArchiveConfig,
}

impl ArchiveBuilder {
    /// Creates a new archive builder.
    pub fn new(
        index: Arc<TreeIndex>,
        blob_store: Arc<dyn BlobStore>,
        config: ArchiveConfig,
    ) -> Self {
        Self {
            index,
            blob_store,
            config,
        }
    }

    /// Assembles the given nodes and their subtrees into one ZIP payload.
    ///
    /// Each selected node is rooted at its own name, so selecting `Docs`
    /// produces `Docs/...` entries rather than absolute paths.
    pub async fn build(&self, owner_id: Uuid, nodes: &[Node]) -> AppResult<Bytes> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.config.compression_level));

        // Depth-first with an explicit stack; async traversal cannot
        // recurse. Seeded in reverse so entries come out in input order.
        let mut stack: Vec<(Node, String)> = nodes
            .iter()
            .rev()
            .map(|n| (n.clone(), n.name.clone()))
            .collect();
        let mut entries = 0usize;

        while let Some((node, entry_path)) = stack.pop() {
            if node.is_folder {
                writer
                    .add_directory(entry_path.as_str(), options)
                    .map_err(|e| AppError::with_source(ErrorKind::Internal, ZIP_FAILED, e))?;
                entries += 1;

                let children = self.index.children(owner_id, node.id).await?;
                for child in children.into_iter().filter(Node::is_active).rev() {
                    let child_path = format!("{}/{}", entry_path, child.name);
                    stack.push((child, child_path));
                }
            } else {
                let storage_path = node.storage_path.as_deref().ok_or_else(|| {
                    AppError::internal(format!("File node '{}' has no storage path", node.path))
                })?;
                let data = self.blob_store.read_bytes(storage_path).await?;

                writer
                    .start_file(entry_path.as_str(), options)
                    .map_err(|e| AppError::with_source(ErrorKind::Internal, ZIP_FAILED, e))?;
                writer.write_all(&data)?;
                entries += 1;
            }
        }

        let cursor = writer
            .finish()
            .map_err(|e| AppError::with_source(ErrorKind::Internal, ZIP_FAILED, e))?;
        let payload = Bytes::from(cursor.into_inner());
        debug!(
            owner_id = %owner_id,
            entries = entries,
            bytes = payload.len(),
            "Assembled archive"
        );
        Ok(payload)
    }
}

const ZIP_FAILED: &str = "Archive write failed";
