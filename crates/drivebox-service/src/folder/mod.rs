//! Folder management.

mod service;

pub use service::{CreateFolderRequest, FolderService, MoveNodeRequest};
