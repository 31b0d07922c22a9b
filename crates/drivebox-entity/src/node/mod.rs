//! Node domain entities.

pub mod model;

pub use model::{CreateNode, Node};
