//! Core type definitions used across the Drivebox workspace.

pub mod pagination;

pub use pagination::{PageRequest, PageResponse};
