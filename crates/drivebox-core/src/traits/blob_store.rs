//! Blob store trait for pluggable file content backends.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::result::AppResult;

/// A byte stream type used for reading blob contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Trait for blob content backends.
///
/// A blob store holds file *contents* addressed by an opaque storage path;
/// the node tree never stores bytes itself, only the path returned by
/// [`BlobStore::put`]. The trait is defined here in `drivebox-core` and
/// implemented in `drivebox-storage`.
///
/// Storage paths are owner-scoped by convention (`{owner_id}/{blob_name}`)
/// so that one user's blobs can never collide with another's.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "memory").
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Store bytes under a freshly generated owner-scoped path and return
    /// that path.
    async fn put(&self, owner_id: uuid::Uuid, file_name: &str, data: Bytes) -> AppResult<String>;

    /// Store bytes in the scratch area (assembled archives awaiting
    /// download) and return the scratch path.
    async fn put_scratch(&self, file_name: &str, data: Bytes) -> AppResult<String>;

    /// Read a blob into memory as a complete byte vector.
    async fn read_bytes(&self, path: &str) -> AppResult<Bytes>;

    /// Read a blob and return its byte stream.
    async fn read(&self, path: &str) -> AppResult<ByteStream>;

    /// Copy a blob into the scratch area under a fresh name that keeps the
    /// source extension, and return the new path. Used when a single file
    /// is downloaded without archiving.
    async fn copy(&self, from: &str) -> AppResult<String>;

    /// Delete a blob at the given path. Deleting a path that no longer
    /// exists is not an error, so a retried purge can make progress.
    async fn delete(&self, path: &str) -> AppResult<()>;

    /// Check whether a blob exists at the given path.
    async fn exists(&self, path: &str) -> AppResult<bool>;

    /// Build the public URL for a stored blob.
    fn public_url(&self, path: &str) -> String;
}
