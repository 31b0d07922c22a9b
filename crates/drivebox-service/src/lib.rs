//! # drivebox-service
//!
//! Business logic service layer for Drivebox. Each service orchestrates
//! the tree index and the blob store to implement application-level use
//! cases: folders, uploads, browsing, the trash lifecycle, and downloads.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references. Every operation takes the
//! acting `owner_id` explicitly; there is no ambient authentication
//! context at this layer.

pub mod engine;
pub mod file;
pub mod folder;
pub mod selection;
pub mod telemetry;
pub mod trash;

pub use engine::DriveEngine;
pub use file::{ArchiveBuilder, BrowseService, DownloadService, UploadService};
pub use folder::FolderService;
pub use selection::NodeSelection;
pub use trash::TrashService;
