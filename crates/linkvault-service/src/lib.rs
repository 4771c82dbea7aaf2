//! # linkvault-service
//!
//! The tree projection (an arena-backed forest of categories and links with
//! stable node identities) and the catalog service that keeps it in sync
//! with the category store.

pub mod catalog;
pub mod tree;

pub use catalog::{CatalogService, SharedForest};
pub use tree::{Forest, Node, NodeData, NodeId, PATH_SEPARATOR};
