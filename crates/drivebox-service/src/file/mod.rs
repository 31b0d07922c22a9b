//! File operations: upload, browsing, archiving, and download.

mod archive;
mod browse;
mod download;
mod upload;

pub use archive::ArchiveBuilder;
pub use browse::{BrowseService, ListRequest};
pub use download::{ArchiveHandle, DownloadService};
pub use upload::{FileUpload, TreeUpload, UploadFilesRequest, UploadService, UploadTreeRequest};
