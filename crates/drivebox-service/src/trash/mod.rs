//! Trash lifecycle management.

mod service;

pub use service::TrashService;
