//! # drivebox-entity
//!
//! Domain entity models for Drivebox. Every struct in this crate
//! represents a node in an owner's file tree or a domain value object.
//! All entities derive `Debug`, `Clone`, `Serialize`, and `Deserialize`.

pub mod node;

pub use node::{CreateNode, Node};
