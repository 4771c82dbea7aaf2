//! Arena-backed projection of the category forest.

pub mod archive;
pub mod forest;
pub mod node;

pub use forest::{Forest, PATH_SEPARATOR};
pub use node::{Node, NodeData, NodeId};
