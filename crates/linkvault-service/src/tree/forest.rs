//! Arena-backed forest of categories and links.

use slotmap::SlotMap;
use tracing::{debug, warn};

use linkvault_core::error::AppError;
use linkvault_core::result::AppResult;
use linkvault_entity::{CategoryItem, LinkItem, UrlStatus};
pub use linkvault_entity::PATH_SEPARATOR;
use linkvault_storage::{LoadReport, LockedCategory, RootEntry};

use super::node::{Node, NodeData, NodeId};

/// Every loaded category and link as an addressable node.
///
/// Nodes live in a slot map: a [`NodeId`] stays valid while the node's value
/// is mutated in place and becomes stale once the node is refreshed or
/// removed. Children are ordered subcategories first, then links.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    nodes: SlotMap<NodeId, Node>,
    roots: Vec<NodeId>,
}

impl Forest {
    /// Create an empty forest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Project a load report. Roots that violate forest invariants are skipped.
    pub fn from_report(report: &LoadReport) -> Self {
        let mut forest = Self::new();
        for entry in &report.roots {
            let added = match entry {
                RootEntry::Unlocked(category) => forest.add_root(category.clone()),
                RootEntry::Locked(locked) => forest.add_locked_root(locked.clone()),
            };
            if let Err(e) = added {
                warn!(category = %entry.name(), error = %e, "Skipping root category");
            }
        }
        debug!(roots = forest.roots.len(), nodes = forest.nodes.len(), "Projected forest");
        forest
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the forest has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level nodes in order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Whether `id` still refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Look up a node.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Look up a node's payload.
    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id).map(|n| &n.data)
    }

    /// Parent of a node; `None` for roots and stale ids.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Children of a node; empty for links and stale ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// The link payload of a node.
    pub fn link(&self, id: NodeId) -> Option<&LinkItem> {
        self.data(id).and_then(NodeData::as_link)
    }

    /// Mutable access to a link payload. The node keeps its identity.
    pub fn link_mut(&mut self, id: NodeId) -> Option<&mut LinkItem> {
        match self.nodes.get_mut(id).map(|n| &mut n.data) {
            Some(NodeData::Link(link)) => Some(link),
            _ => None,
        }
    }

    /// Set the health status of a link. Returns `false` if `id` is stale or
    /// not a link.
    pub fn set_url_status(&mut self, id: NodeId, status: UrlStatus) -> bool {
        match self.link_mut(id) {
            Some(link) => {
                link.url_status = status;
                true
            }
            None => false,
        }
    }

    /// Top-level ancestor of a node (the node itself for roots).
    pub fn root_of(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        self.nodes.get(current)?;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        Some(current)
    }

    /// Find a top-level category by name.
    pub fn find_root(&self, name: &str) -> Option<NodeId> {
        self.roots
            .iter()
            .copied()
            .find(|&id| self.data(id).is_some_and(|d| d.name() == name))
    }

    /// Find a direct child category by name.
    pub fn find_child_category(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&id| self.data(id).is_some_and(|d| d.is_category() && d.name() == name))
    }

    /// Resolve a dotted category path such as `"A.B.C"`.
    pub fn find_by_path(&self, path: &str) -> Option<NodeId> {
        let mut segments = path.split(PATH_SEPARATOR);
        let mut current = self.find_root(segments.next()?)?;
        for segment in segments {
            current = self.find_child_category(current, segment)?;
        }
        Some(current)
    }

    /// Dotted path of category names from the root down to `id`.
    ///
    /// For a link node this is the path of the category holding it.
    pub fn category_path(&self, id: NodeId) -> AppResult<String> {
        let node = self.node(id)?;
        let mut current = match node.data {
            NodeData::Link(_) => node
                .parent
                .ok_or_else(|| AppError::internal("Link node has no parent category"))?,
            _ => id,
        };

        let mut names = Vec::new();
        loop {
            let node = self.node(current)?;
            names.push(node.data.name());
            match node.parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        names.reverse();
        Ok(names.join(PATH_SEPARATOR))
    }

    /// Pre-order traversal: the node itself, then each child in stored order,
    /// recursing depth-first.
    pub fn get_subtree(&self, id: NodeId) -> AppResult<Vec<(NodeId, &NodeData)>> {
        self.node(id)?;
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(current) {
                out.push((current, &node.data));
                stack.extend(node.children.iter().rev().copied());
            }
        }
        Ok(out)
    }

    /// Every category strictly below `id`, in traversal order.
    pub fn subcategories(&self, id: NodeId) -> AppResult<Vec<NodeId>> {
        Ok(self
            .get_subtree(id)?
            .into_iter()
            .skip(1)
            .filter(|(_, data)| data.is_category())
            .map(|(id, _)| id)
            .collect())
    }

    /// Every link at or below `id`, in traversal order.
    pub fn links_in_subtree(&self, id: NodeId) -> AppResult<Vec<NodeId>> {
        Ok(self
            .get_subtree(id)?
            .into_iter()
            .filter(|(_, data)| matches!(data, NodeData::Link(_)))
            .map(|(id, _)| id)
            .collect())
    }

    /// Reassemble the nested category value rooted at `id`.
    pub fn to_category(&self, id: NodeId) -> AppResult<CategoryItem> {
        let node = self.node(id)?;
        let mut item = match &node.data {
            NodeData::Category(header) => header.clone(),
            NodeData::Locked(locked) => {
                return Err(AppError::locked(format!(
                    "Category '{}' is locked",
                    locked.name
                )));
            }
            NodeData::Link(link) => {
                return Err(AppError::validation(format!(
                    "'{}' is a link, not a category",
                    link.title
                )));
            }
        };

        for &child in &node.children {
            match self.data(child) {
                Some(NodeData::Link(link)) => item.links.push(link.clone()),
                Some(_) => item.categories.push(self.to_category(child)?),
                None => return Err(AppError::internal("Dangling child reference")),
            }
        }
        Ok(item)
    }

    /// Add a top-level category and its whole subtree.
    pub fn add_root(&mut self, category: CategoryItem) -> AppResult<NodeId> {
        category.validate(true)?;
        self.check_root_name(&category.name, None)?;
        if category.is_archive_node && self.archive_node().is_some() {
            return Err(AppError::validation("An archive category already exists"));
        }
        let id = self.insert_subtree(None, category);
        self.roots.push(id);
        Ok(id)
    }

    /// Add a placeholder for a top-level category that is still locked.
    pub fn add_locked_root(&mut self, locked: LockedCategory) -> AppResult<NodeId> {
        self.check_root_name(&locked.name, None)?;
        let id = self.nodes.insert(Node {
            data: NodeData::Locked(locked),
            parent: None,
            children: Vec::new(),
        });
        self.roots.push(id);
        Ok(id)
    }

    /// Add a subcategory (with its subtree) under `parent`, after the
    /// existing subcategories.
    pub fn add_category(&mut self, parent: NodeId, category: CategoryItem) -> AppResult<NodeId> {
        self.expect_unlocked_category(parent)?;
        category.validate(false)?;
        if self.find_child_category(parent, &category.name).is_some() {
            return Err(AppError::validation(format!(
                "A category named '{}' already exists here",
                category.name
            )));
        }
        let id = self.insert_subtree(Some(parent), category);
        self.attach_category(parent, id);
        Ok(id)
    }

    /// Append a link to `parent`.
    pub fn add_link(&mut self, parent: NodeId, link: LinkItem) -> AppResult<NodeId> {
        self.expect_unlocked_category(parent)?;
        if link.target.trim().is_empty() {
            return Err(AppError::validation("Link target must not be empty"));
        }
        let id = self.nodes.insert(Node {
            data: NodeData::Link(link),
            parent: Some(parent),
            children: Vec::new(),
        });
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(id);
        }
        Ok(id)
    }

    /// Replace a node's payload, keeping its position and children.
    ///
    /// The old id is invalidated; callers must continue with the returned id.
    /// A category payload's own `categories` and `links` are ignored. Turning
    /// a category into a locked placeholder drops its descendants.
    pub fn refresh_node(&mut self, old: NodeId, data: NodeData) -> AppResult<NodeId> {
        let node = self.node(old)?;
        let data = match data {
            NodeData::Category(mut header) => {
                header.categories.clear();
                header.links.clear();
                header.validate(node.parent.is_none())?;
                NodeData::Category(header)
            }
            other => other,
        };
        self.check_replacement(old, node, &data)?;

        let drop_children = matches!(data, NodeData::Locked(_));
        let Some(old_node) = self.nodes.remove(old) else {
            return Err(stale(old));
        };
        let children = if drop_children {
            for child in old_node.children {
                self.remove_recursive(child);
            }
            Vec::new()
        } else {
            old_node.children
        };

        let new_id = self.nodes.insert(Node {
            data,
            parent: old_node.parent,
            children: children.clone(),
        });
        for child in children {
            if let Some(c) = self.nodes.get_mut(child) {
                c.parent = Some(new_id);
            }
        }
        self.relink(old_node.parent, old, new_id);
        debug!(?old, ?new_id, "Refreshed node");
        Ok(new_id)
    }

    /// Replace a category node and everything below it with `category`.
    ///
    /// Used when a locked root is unlocked or a record is reloaded. The old id
    /// and every descendant id are invalidated.
    pub fn replace_subtree(&mut self, old: NodeId, category: CategoryItem) -> AppResult<NodeId> {
        let node = self.node(old)?;
        if !node.data.is_category() {
            return Err(AppError::validation("Only a category subtree can be replaced"));
        }
        category.validate(node.parent.is_none())?;
        let header = NodeData::Category(category.clone());
        self.check_replacement(old, node, &header)?;

        let parent = node.parent;
        let Some(old_node) = self.nodes.remove(old) else {
            return Err(stale(old));
        };
        for child in old_node.children {
            self.remove_recursive(child);
        }
        let new_id = self.insert_subtree(parent, category);
        self.relink(parent, old, new_id);
        Ok(new_id)
    }

    /// Remove a node and its subtree. The archive category cannot be removed.
    pub fn remove(&mut self, id: NodeId) -> AppResult<()> {
        let node = self.node(id)?;
        if is_archive(&node.data) {
            return Err(AppError::validation("The archive category cannot be removed"));
        }
        self.detach(id);
        self.remove_recursive(id);
        Ok(())
    }

    fn node(&self, id: NodeId) -> AppResult<&Node> {
        self.nodes.get(id).ok_or_else(|| stale(id))
    }

    fn expect_unlocked_category(&self, id: NodeId) -> AppResult<()> {
        match &self.node(id)?.data {
            NodeData::Category(_) => Ok(()),
            NodeData::Locked(l) => Err(AppError::locked(format!("Category '{}' is locked", l.name))),
            NodeData::Link(l) => Err(AppError::validation(format!(
                "'{}' is a link, not a category",
                l.title
            ))),
        }
    }

    fn check_root_name(&self, name: &str, except: Option<NodeId>) -> AppResult<()> {
        match self.find_root(name) {
            Some(existing) if Some(existing) != except => Err(AppError::validation(format!(
                "A top-level category named '{name}' already exists"
            ))),
            _ => Ok(()),
        }
    }

    fn check_replacement(&self, old: NodeId, node: &Node, data: &NodeData) -> AppResult<()> {
        match (&node.data, data) {
            (NodeData::Link(_), NodeData::Link(_)) => return Ok(()),
            (NodeData::Link(_), _) | (_, NodeData::Link(_)) => {
                return Err(AppError::validation(
                    "A link and a category cannot replace each other",
                ));
            }
            _ => {}
        }

        if matches!(data, NodeData::Locked(_)) && node.parent.is_some() {
            return Err(AppError::validation("Only top-level categories can be locked"));
        }
        if is_archive(&node.data) != is_archive(data) {
            return Err(AppError::validation(
                "The archive marker of a category cannot be changed",
            ));
        }
        if is_archive(&node.data) && node.data.name() != data.name() {
            return Err(AppError::validation("The archive category cannot be renamed"));
        }

        match node.parent {
            None => self.check_root_name(data.name(), Some(old)),
            Some(parent) => match self.find_child_category(parent, data.name()) {
                Some(existing) if existing != old => Err(AppError::validation(format!(
                    "A category named '{}' already exists here",
                    data.name()
                ))),
                _ => Ok(()),
            },
        }
    }

    /// Insert `category` and its descendants. Does not link it into `parent`.
    fn insert_subtree(&mut self, parent: Option<NodeId>, mut category: CategoryItem) -> NodeId {
        let subcategories = std::mem::take(&mut category.categories);
        let links = std::mem::take(&mut category.links);
        let id = self.nodes.insert(Node {
            data: NodeData::Category(category),
            parent,
            children: Vec::with_capacity(subcategories.len() + links.len()),
        });

        let mut children = Vec::with_capacity(subcategories.len() + links.len());
        for sub in subcategories {
            children.push(self.insert_subtree(Some(id), sub));
        }
        for link in links {
            children.push(self.nodes.insert(Node {
                data: NodeData::Link(link),
                parent: Some(id),
                children: Vec::new(),
            }));
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.children = children;
        }
        id
    }

    /// Link an existing category node as the last subcategory of `parent`.
    pub(crate) fn attach_category(&mut self, parent: NodeId, id: NodeId) {
        let position = self
            .children(parent)
            .iter()
            .position(|&c| matches!(self.data(c), Some(NodeData::Link(_))));
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent) {
            match position {
                Some(index) => node.children.insert(index, id),
                None => node.children.push(id),
            }
        }
    }

    /// Link an existing link node as the last link of `parent`.
    pub(crate) fn attach_link(&mut self, parent: NodeId, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(id);
        }
    }

    /// Unlink a node from its parent (or the root list) without freeing it.
    pub(crate) fn detach(&mut self, id: NodeId) {
        match self.parent(id) {
            Some(parent) => {
                if let Some(node) = self.nodes.get_mut(parent) {
                    node.children.retain(|&c| c != id);
                }
            }
            None => self.roots.retain(|&r| r != id),
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = None;
        }
    }

    pub(crate) fn data_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id).map(|n| &mut n.data)
    }

    fn relink(&mut self, parent: Option<NodeId>, old: NodeId, new: NodeId) {
        let siblings = match parent {
            Some(parent) => match self.nodes.get_mut(parent) {
                Some(node) => &mut node.children,
                None => return,
            },
            None => &mut self.roots,
        };
        if let Some(slot) = siblings.iter_mut().find(|c| **c == old) {
            *slot = new;
        }
    }

    fn remove_recursive(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.remove(id) {
            for child in node.children {
                self.remove_recursive(child);
            }
        }
    }
}

pub(crate) fn is_archive(data: &NodeData) -> bool {
    matches!(data, NodeData::Category(c) if c.is_archive_node)
}

fn stale(id: NodeId) -> AppError {
    AppError::not_found(format!("Node {id:?} does not exist"))
}
