//! Trait definitions shared across the Drivebox workspace.

pub mod blob_store;

pub use blob_store::{BlobStore, ByteStream};
