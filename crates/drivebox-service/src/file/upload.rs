//! File upload service: flat batches and whole folder trees.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use drivebox_core::config::StorageConfig;
use drivebox_core::traits::BlobStore;
use drivebox_core::{AppError, AppResult};
use drivebox_entity::node::{CreateNode, Node};
use drivebox_index::TreeIndex;

use crate::selection::resolve_parent_folder;

/// One file in a flat upload batch.
#[derive(Debug, Clone)]
pub struct FileUpload {
    /// File name, including extension.
    pub name: String,
    /// MIME type as reported by the client, if any.
    pub mime_type: Option<String>,
    /// File content bytes.
    pub data: Bytes,
}

/// One file in a folder-tree upload.
#[derive(Debug, Clone)]
pub struct TreeUpload {
    /// Path of the file relative to the target folder, e.g. `Docs/Sub/b.txt`.
    /// Every intermediate segment becomes (or reuses) a folder.
    pub relative_path: String,
    /// MIME type as reported by the client, if any.
    pub mime_type: Option<String>,
    /// File content bytes.
    pub data: Bytes,
}

/// Request for uploading a batch of files into one folder.
#[derive(Debug, Clone)]
pub struct UploadFilesRequest {
    /// Target folder path. Empty or absent targets the root folder.
    pub parent_path: Option<String>,
    /// The files to store.
    pub files: Vec<FileUpload>,
}

/// Request for uploading a folder tree.
#[derive(Debug, Clone)]
pub struct UploadTreeRequest {
    /// Target folder path. Empty or absent targets the root folder.
    pub parent_path: Option<String>,
    /// The files to store, keyed by their relative paths.
    pub entries: Vec<TreeUpload>,
}

/// Handles file uploads.
///
/// Both flows validate the entire batch before writing anything, so a
/// rejected request stores no blobs and creates no nodes.
#[derive(Debug, Clone)]
pub struct UploadService {
    index: Arc<TreeIndex>,
    blob_store: Arc<dyn BlobStore>,
    config: StorageConfig,
}

impl UploadService {
    /// Creates a new upload service.
    pub fn new(
        index: Arc<TreeIndex>,
        blob_store: Arc<dyn BlobStore>,
        config: StorageConfig,
    ) -> Self {
        Self {
            index,
            blob_store,
            config,
        }
    }

    /// Uploads a batch of files into one folder.
    pub async fn upload_files(
        &self,
        owner_id: Uuid,
        request: UploadFilesRequest,
    ) -> AppResult<Vec<Node>> {
        if request.files.is_empty() {
            return Err(AppError::empty_selection("Please select files to upload"));
        }

        let parent =
            resolve_parent_folder(&self.index, owner_id, request.parent_path.as_deref()).await?;

        let mut seen = HashSet::new();
        for file in &request.files {
            self.check_size(file.data.len())?;
            check_name(&file.name)?;
            if !seen.insert(file.name.clone()) {
                return Err(AppError::conflict(format!(
                    "'{}' appears more than once in this upload",
                    file.name
                )));
            }
            let target = format!("{}/{}", parent.path, file.name);
            if self.index.find_by_path(owner_id, &target).await?.is_some() {
                return Err(AppError::conflict(format!(
                    "'{}' already exists in this folder",
                    file.name
                )));
            }
        }

        let mut created = Vec::with_capacity(request.files.len());
        for file in request.files {
            let node = self.store_one(owner_id, parent.id, file).await?;
            created.push(node);
        }

        info!(
            owner_id = %owner_id,
            folder = %parent.path,
            count = created.len(),
            "Upload completed"
        );
        Ok(created)
    }

    /// Uploads a folder tree, creating intermediate folders as needed.
    ///
    /// Folders already present under the target are reused; files with
    /// clashing paths reject the whole batch. Returns the created file
    /// nodes only, not the folders.
    pub async fn upload_tree(
        &self,
        owner_id: Uuid,
        request: UploadTreeRequest,
    ) -> AppResult<Vec<Node>> {
        if request.entries.is_empty() {
            return Err(AppError::empty_selection("Please select files to upload"));
        }

        let parent =
            resolve_parent_folder(&self.index, owner_id, request.parent_path.as_deref()).await?;

        // Pre-flight the whole batch: sizes, segment names, and conflicts
        // with existing nodes or within the request itself.
        let mut leaf_paths = HashSet::new();
        let mut folder_paths = HashSet::new();
        for entry in &request.entries {
            self.check_size(entry.data.len())?;
            let segments = split_relative_path(&entry.relative_path)?;

            let mut prefix = parent.path.clone();
            for segment in &segments[..segments.len() - 1] {
                prefix = format!("{prefix}/{segment}");
                folder_paths.insert(prefix.clone());
                if let Some(existing) = self.index.find_by_path(owner_id, &prefix).await? {
                    if !existing.is_folder {
                        return Err(AppError::conflict(format!(
                            "'{}' already exists as a file",
                            existing.name
                        )));
                    }
                    if existing.is_trashed() {
                        return Err(AppError::validation(format!(
                            "Folder '{}' is in the trash",
                            existing.name
                        )));
                    }
                }
            }

            let leaf = format!("{}/{}", prefix, segments[segments.len() - 1]);
            if self.index.find_by_path(owner_id, &leaf).await?.is_some() {
                return Err(AppError::conflict(format!(
                    "'{}' already exists",
                    segments[segments.len() - 1]
                )));
            }
            if !leaf_paths.insert(leaf) {
                return Err(AppError::conflict(format!(
                    "'{}' appears more than once in this upload",
                    entry.relative_path
                )));
            }
        }
        if let Some(clash) = folder_paths.intersection(&leaf_paths).next() {
            return Err(AppError::conflict(format!(
                "'{clash}' appears as both a file and a folder in this upload"
            )));
        }

        let mut created = Vec::with_capacity(request.entries.len());
        for entry in request.entries {
            let segments = split_relative_path(&entry.relative_path)?;
            let mut folder = parent.clone();
            for segment in &segments[..segments.len() - 1] {
                folder = self.reuse_or_create_folder(owner_id, &folder, segment).await?;
            }

            let node = self
                .store_one(
                    owner_id,
                    folder.id,
                    FileUpload {
                        name: segments[segments.len() - 1].clone(),
                        mime_type: entry.mime_type,
                        data: entry.data,
                    },
                )
                .await?;
            created.push(node);
        }

        info!(
            owner_id = %owner_id,
            folder = %parent.path,
            files = created.len(),
            "Tree upload completed"
        );
        Ok(created)
    }

    /// Writes one file's blob, then registers the node. The blob is
    /// removed again if the node cannot be appended, so a lost race on
    /// the name leaves no orphan bytes behind.
    async fn store_one(&self, owner_id: Uuid, parent_id: Uuid, file: FileUpload) -> AppResult<Node> {
        let size = file.data.len() as i64;
        let mime = file.mime_type.or_else(|| mime_from_name(&file.name));
        let storage_path = self
            .blob_store
            .put(owner_id, &file.name, file.data)
            .await?;

        let payload = CreateNode::file(&file.name, &storage_path, mime, size);
        match self.index.append_node(owner_id, parent_id, payload).await {
            Ok(node) => Ok(node),
            Err(err) => {
                let _ = self.blob_store.delete(&storage_path).await;
                Err(err)
            }
        }
    }

    /// Returns the named child folder, creating it when absent.
    async fn reuse_or_create_folder(
        &self,
        owner_id: Uuid,
        parent: &Node,
        name: &str,
    ) -> AppResult<Node> {
        let path = format!("{}/{}", parent.path, name);
        if let Some(existing) = self.index.find_by_path(owner_id, &path).await? {
            if !existing.is_folder {
                return Err(AppError::conflict(format!(
                    "'{name}' already exists as a file"
                )));
            }
            if existing.is_trashed() {
                return Err(AppError::validation(format!(
                    "Folder '{name}' is in the trash"
                )));
            }
            return Ok(existing);
        }
        self.index
            .append_node(owner_id, parent.id, CreateNode::folder(name))
            .await
    }

    fn check_size(&self, len: usize) -> AppResult<()> {
        if len as u64 > self.config.max_upload_size_bytes {
            return Err(AppError::validation(format!(
                "File exceeds maximum upload size of {} bytes",
                self.config.max_upload_size_bytes
            )));
        }
        Ok(())
    }
}

fn check_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::validation("File name cannot be empty"));
    }
    if name.contains('/') {
        return Err(AppError::validation(format!(
            "File name cannot contain '/': '{name}'"
        )));
    }
    Ok(())
}

/// Splits a relative upload path into validated segments.
fn split_relative_path(relative_path: &str) -> AppResult<Vec<String>> {
    let segments: Vec<String> = relative_path
        .split('/')
        .map(|s| s.trim().to_string())
        .collect();
    if segments.iter().any(|s| s.is_empty() || s == "." || s == "..") {
        return Err(AppError::validation(format!(
            "Invalid relative path: '{relative_path}'"
        )));
    }
    Ok(segments)
}

/// Guesses a MIME type from the file name extension.
fn mime_from_name(name: &str) -> Option<String> {
    let ext = name.rsplit('.').next()?.to_lowercase();
    let mime = match ext.as_str() {
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" | "gzip" => "application/gzip",
        "tar" => "application/x-tar",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "csv" => "text/csv",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        _ => return None,
    };
    Some(mime.to_string())
}
