//! # drivebox-core
//!
//! Core crate for Drivebox. Contains the `BlobStore` trait, configuration
//! schemas, pagination types, and the unified error system shared by every
//! other crate.
//!
//! This crate has **no** internal dependencies on other Drivebox crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
