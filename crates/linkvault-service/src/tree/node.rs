//! Forest nodes.

use slotmap::new_key_type;

use linkvault_entity::{CategoryItem, LinkItem, PasswordProtection};
use linkvault_storage::LockedCategory;

new_key_type! {
    /// Stable identity of a node in a [`Forest`](super::Forest).
    ///
    /// Survives in-place value mutation (such as a health check setting a
    /// link's status). Invalidated when the node is refreshed or removed.
    pub struct NodeId;
}

/// Payload of a forest node.
///
/// A category payload never carries children itself: its subcategories and
/// links live in the arena as separate nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    /// A category header (name, description, protection, ...).
    Category(CategoryItem),
    /// A link.
    Link(LinkItem),
    /// A top-level category that is still locked.
    Locked(LockedCategory),
}

impl NodeData {
    /// Display name: category name or link title.
    pub fn name(&self) -> &str {
        match self {
            Self::Category(c) => &c.name,
            Self::Link(l) => &l.title,
            Self::Locked(l) => &l.name,
        }
    }

    /// Whether this node is a category (locked or not).
    pub fn is_category(&self) -> bool {
        matches!(self, Self::Category(_) | Self::Locked(_))
    }

    /// Protection of a category node.
    pub fn protection(&self) -> Option<PasswordProtection> {
        match self {
            Self::Category(c) => Some(c.password_protection),
            Self::Locked(l) => Some(l.protection),
            Self::Link(_) => None,
        }
    }

    /// The category header, if this is an unlocked category.
    pub fn as_category(&self) -> Option<&CategoryItem> {
        match self {
            Self::Category(c) => Some(c),
            _ => None,
        }
    }

    /// The link, if this is a link.
    pub fn as_link(&self) -> Option<&LinkItem> {
        match self {
            Self::Link(l) => Some(l),
            _ => None,
        }
    }
}

/// One addressable node of the forest.
#[derive(Debug, Clone)]
pub struct Node {
    /// Payload.
    pub data: NodeData,
    /// Non-owning back-reference to the parent; `None` for roots.
    pub parent: Option<NodeId>,
    /// Ordered children: subcategories first, then links, each in stored order.
    pub children: Vec<NodeId>,
}
