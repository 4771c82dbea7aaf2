//! Catalog orchestration between the store and the tree projection.

pub mod service;

pub use service::{CatalogService, SharedForest};
