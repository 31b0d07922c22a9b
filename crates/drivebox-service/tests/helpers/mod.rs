//! Shared test helpers for integration tests.

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use uuid::Uuid;
use zip::ZipArchive;

use drivebox_core::config::AppConfig;
use drivebox_core::traits::BlobStore;
use drivebox_entity::node::Node;
use drivebox_service::file::{FileUpload, UploadFilesRequest};
use drivebox_service::folder::CreateFolderRequest;
use drivebox_service::DriveEngine;
use drivebox_storage::MemoryBlobStore;

/// A fully wired engine over an in-memory blob store, plus one owner.
pub struct TestDrive {
    /// The assembled engine under test.
    pub engine: DriveEngine,
    /// Direct handle on the blob store for byte-level assertions.
    pub blobs: Arc<MemoryBlobStore>,
    /// The acting owner for this test.
    pub owner: Uuid,
}

impl TestDrive {
    /// Create a test drive with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create a test drive with a custom configuration.
    pub fn with_config(config: AppConfig) -> Self {
        let blobs = Arc::new(MemoryBlobStore::new());
        let engine = DriveEngine::with_blob_store(config, blobs.clone());
        Self {
            engine,
            blobs,
            owner: Uuid::new_v4(),
        }
    }

    /// Create a folder and return its node.
    pub async fn mkdir(&self, parent: Option<&str>, name: &str) -> Node {
        self.engine
            .folders
            .create_folder(
                self.owner,
                CreateFolderRequest {
                    parent_path: parent.map(String::from),
                    name: name.to_string(),
                },
            )
            .await
            .expect("create folder")
    }

    /// Upload a single file and return its node.
    pub async fn upload(&self, parent: Option<&str>, name: &str, body: &[u8]) -> Node {
        let mut nodes = self
            .engine
            .uploads
            .upload_files(
                self.owner,
                UploadFilesRequest {
                    parent_path: parent.map(String::from),
                    files: vec![FileUpload {
                        name: name.to_string(),
                        mime_type: None,
                        data: Bytes::copy_from_slice(body),
                    }],
                },
            )
            .await
            .expect("upload file");
        nodes.remove(0)
    }

    /// Read the blob behind a `memory://` download URL.
    pub async fn read_blob(&self, url: &str) -> Bytes {
        let path = url.strip_prefix("memory://").expect("memory url");
        self.blobs.read_bytes(path).await.expect("read blob")
    }

    /// Entry names of the ZIP behind a download URL, in archive order.
    pub async fn zip_entries(&self, url: &str) -> Vec<String> {
        let data = self.read_blob(url).await;
        let archive = ZipArchive::new(Cursor::new(data.to_vec())).expect("open zip");
        archive.file_names().map(String::from).collect()
    }

    /// Body of one ZIP entry behind a download URL.
    pub async fn zip_entry_body(&self, url: &str, entry: &str) -> String {
        let data = self.read_blob(url).await;
        let mut archive = ZipArchive::new(Cursor::new(data.to_vec())).expect("open zip");
        let mut body = String::new();
        std::io::Read::read_to_string(&mut archive.by_name(entry).expect("entry"), &mut body)
            .expect("read entry");
        body
    }
}
