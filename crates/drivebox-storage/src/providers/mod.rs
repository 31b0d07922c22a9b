//! Blob store provider implementations.
//!
//! Both providers use the same path scheme: uploads live under
//! `uploads/{owner_id}/`, generated downloads (archives and single-file
//! copies) under `scratch/`. Generated names are UUIDv7 so they sort by
//! creation time, with the source extension kept for content-type
//! sniffing downstream.

use uuid::Uuid;

pub mod local;
pub mod memory;

pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;

/// Prefix for owner uploads.
const UPLOAD_PREFIX: &str = "uploads";
/// Prefix for ephemeral generated blobs.
const SCRATCH_PREFIX: &str = "scratch";

/// Extension of a path or file name, if it has one.
fn extension_of(name: &str) -> Option<&str> {
    let base = name.rsplit('/').next().unwrap_or(name);
    let ext = base.rsplit('.').next()?;
    (ext != base && !ext.is_empty()).then_some(ext)
}

/// Fresh owner-scoped upload path for a new blob.
pub(crate) fn upload_path(owner_id: Uuid, file_name: &str) -> String {
    let id = Uuid::now_v7().simple();
    match extension_of(file_name) {
        Some(ext) => format!("{UPLOAD_PREFIX}/{owner_id}/{id}.{ext}"),
        None => format!("{UPLOAD_PREFIX}/{owner_id}/{id}"),
    }
}

/// Scratch path for a generated blob with a caller-chosen name.
pub(crate) fn scratch_path(file_name: &str) -> String {
    format!("{SCRATCH_PREFIX}/{file_name}")
}

/// Fresh scratch path for a copy of `from`, keeping its extension.
pub(crate) fn copy_path(from: &str) -> String {
    let id = Uuid::now_v7().simple();
    match extension_of(from) {
        Some(ext) => format!("{SCRATCH_PREFIX}/{id}.{ext}"),
        None => format!("{SCRATCH_PREFIX}/{id}"),
    }
}
