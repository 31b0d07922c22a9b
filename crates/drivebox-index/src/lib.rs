//! # drivebox-index
//!
//! The tree index: one nested-set forest per owner, stored in memory and
//! guarded by a per-owner read/write lock.
//!
//! [`forest`] holds the synchronous bound arithmetic; [`store`] wraps it
//! in the async, owner-keyed [`TreeIndex`] used by the service layer.

pub mod forest;
pub mod store;

pub use forest::{Forest, ROOT_NAME};
pub use store::TreeIndex;
