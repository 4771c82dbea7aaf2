//! Moving links and categories into the synthetic archive category.

use chrono::Utc;
use tracing::info;

use linkvault_core::error::AppError;
use linkvault_core::result::AppResult;
use linkvault_entity::{ARCHIVE_NODE_NAME, CategoryItem, PasswordProtection};

use super::forest::{Forest, is_archive};
use super::node::{NodeData, NodeId};

impl Forest {
    /// The archive category, if one exists.
    pub fn archive_node(&self) -> Option<NodeId> {
        self.roots()
            .iter()
            .copied()
            .find(|&id| self.data(id).is_some_and(is_archive))
    }

    /// Whether `id` is the archive category or lies beneath it.
    pub fn is_archived(&self, id: NodeId) -> bool {
        self.root_of(id)
            .and_then(|root| self.data(root))
            .is_some_and(is_archive)
    }

    /// Return the archive category, creating it at the end of the roots if
    /// it does not exist yet.
    pub fn ensure_archive_node(&mut self) -> AppResult<NodeId> {
        if let Some(id) = self.archive_node() {
            return Ok(id);
        }
        let id = self.add_root(CategoryItem::archive_node())?;
        info!("Created archive category");
        Ok(id)
    }

    /// Protection of the archive category, `None` if it does not exist yet.
    pub fn archive_protection(&self) -> PasswordProtection {
        self.archive_node()
            .and_then(|id| self.data(id))
            .and_then(NodeData::protection)
            .unwrap_or_default()
    }

    /// Reject moving content out of a protected top-level category into an
    /// archive that would store it in plaintext.
    fn check_archive_protection(&self, id: NodeId) -> AppResult<()> {
        let source = self
            .root_of(id)
            .and_then(|root| self.data(root))
            .and_then(NodeData::protection)
            .unwrap_or_default();
        if source.is_protected() && !self.archive_protection().is_protected() {
            return Err(AppError::validation(format!(
                "Content of protected categories can only be archived into a protected \
                 archive; protect '{ARCHIVE_NODE_NAME}' first"
            )));
        }
        Ok(())
    }

    /// Move a link into the archive category and stamp its archive date.
    ///
    /// The link keeps its identity. Returns the archive category's id.
    pub fn archive_link(&mut self, id: NodeId) -> AppResult<NodeId> {
        if self.link(id).is_none() {
            return Err(AppError::validation("Only links can be archived with archive_link"));
        }
        if self.is_archived(id) {
            return Err(AppError::validation("Link is already archived"));
        }
        self.check_archive_protection(id)?;

        let archive = self.ensure_archive_node()?;
        self.detach(id);
        if let Some(link) = self.link_mut(id) {
            link.archived_date = Some(Utc::now());
        }
        self.attach_link(archive, id);
        Ok(archive)
    }

    /// Move a whole category (top-level or nested) beneath the archive
    /// category and stamp its archive date.
    ///
    /// A name clash inside the archive is resolved by appending ` (n)`. A
    /// top-level category gives up its own protection and falls under the
    /// archive's. The category keeps its identity. Returns the archive
    /// category's id.
    pub fn archive_category(&mut self, id: NodeId) -> AppResult<NodeId> {
        match self.data(id) {
            Some(NodeData::Category(c)) if c.is_archive_node => {
                return Err(AppError::validation("The archive category cannot be archived"));
            }
            Some(NodeData::Category(_)) => {}
            Some(NodeData::Locked(l)) => {
                return Err(AppError::locked(format!(
                    "Category '{}' must be unlocked before archiving",
                    l.name
                )));
            }
            Some(NodeData::Link(_)) => {
                return Err(AppError::validation(
                    "Only categories can be archived with archive_category",
                ));
            }
            None => return Err(AppError::not_found(format!("Node {id:?} does not exist"))),
        }
        if self.is_archived(id) {
            return Err(AppError::validation("Category is already archived"));
        }
        self.check_archive_protection(id)?;

        let archive = self.ensure_archive_node()?;
        self.detach(id);
        let name = self.free_child_name(archive, self.data(id).map(|d| d.name()).unwrap_or(""));
        if let Some(NodeData::Category(category)) = self.data_mut(id) {
            category.name = name;
            category.password_protection = PasswordProtection::None;
            category.archived_date = Some(Utc::now());
        }
        self.attach_category(archive, id);
        Ok(archive)
    }

    fn free_child_name(&self, parent: NodeId, base: &str) -> String {
        if self.find_child_category(parent, base).is_none() {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{base} ({n})"))
            .find(|candidate| self.find_child_category(parent, candidate).is_none())
            .unwrap_or_else(|| base.to_string())
    }
}

#[cfg(test)]
mod tests {
    use linkvault_core::error::ErrorKind;
    use linkvault_entity::LinkItem;

    use super::*;

    fn catalog() -> Forest {
        let mut forest = Forest::new();
        forest
            .add_root(
                CategoryItem::new("Work")
                    .with_category(CategoryItem::new("Old").with_link(LinkItem::new("x", "/x")))
                    .with_link(LinkItem::new_url("Wiki", "https://wiki.example")),
            )
            .unwrap();
        forest
    }

    #[test]
    fn test_ensure_archive_node_is_idempotent() {
        let mut forest = catalog();
        let first = forest.ensure_archive_node().unwrap();
        let second = forest.ensure_archive_node().unwrap();
        assert_eq!(first, second);
        assert_eq!(forest.roots().len(), 2);
        assert_eq!(forest.data(first).unwrap().name(), ARCHIVE_NODE_NAME);
    }

    #[test]
    fn test_archive_link_moves_and_stamps() {
        let mut forest = catalog();
        let work = forest.find_root("Work").unwrap();
        let wiki = *forest.children(work).last().unwrap();

        let archive = forest.archive_link(wiki).unwrap();
        assert_eq!(forest.parent(wiki), Some(archive));
        assert!(forest.link(wiki).unwrap().archived_date.is_some());
        assert!(!forest.children(work).contains(&wiki));

        let err = forest.archive_link(wiki).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_archive_category_resolves_name_clash() {
        let mut forest = catalog();
        let old = forest.find_by_path("Work.Old").unwrap();
        forest.archive_category(old).unwrap();

        let work = forest.find_root("Work").unwrap();
        let again = forest.add_category(work, CategoryItem::new("Old")).unwrap();
        forest.archive_category(again).unwrap();

        assert_eq!(forest.category_path(old).unwrap(), "Archive.Old");
        assert_eq!(forest.category_path(again).unwrap(), "Archive.Old (2)");
    }

    #[test]
    fn test_archive_root_category() {
        let mut forest = catalog();
        let work = forest.find_root("Work").unwrap();
        forest.archive_category(work).unwrap();
        assert_eq!(forest.roots().len(), 1);
        assert!(forest.is_archived(work));
        assert!(forest.data(work).unwrap().as_category().unwrap().archived_date.is_some());
    }

    #[test]
    fn test_protected_content_needs_protected_archive() {
        let mut forest = catalog();
        let vault = forest
            .add_root(
                CategoryItem::new("Vault")
                    .with_protection(PasswordProtection::OwnPassword)
                    .with_link(LinkItem::new_url("Bank", "https://bank.example")),
            )
            .unwrap();
        let bank = forest.children(vault)[0];

        let err = forest.archive_link(bank).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        let err = forest.archive_category(vault).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(forest.parent(bank), Some(vault));
        assert!(forest.archive_node().is_none());

        let archive = forest.ensure_archive_node().unwrap();
        let header = NodeData::Category(
            CategoryItem::archive_node().with_protection(PasswordProtection::GlobalPassword),
        );
        forest.refresh_node(archive, header).unwrap();
        assert!(forest.archive_protection().is_protected());

        forest.archive_category(vault).unwrap();
        let moved = forest.data(vault).unwrap().as_category().unwrap();
        assert_eq!(moved.password_protection, PasswordProtection::None);
        let root = forest.archive_node().unwrap();
        assert!(forest.to_category(root).unwrap().validate(true).is_ok());
    }

    #[test]
    fn test_archive_node_is_protected() {
        let mut forest = catalog();
        let archive = forest.ensure_archive_node().unwrap();
        assert_eq!(
            forest.archive_category(archive).unwrap_err().kind,
            ErrorKind::Validation
        );
        assert_eq!(forest.remove(archive).unwrap_err().kind, ErrorKind::Validation);
        let renamed = NodeData::Category(CategoryItem {
            name: "Attic".to_string(),
            ..CategoryItem::archive_node()
        });
        assert_eq!(
            forest.refresh_node(archive, renamed).unwrap_err().kind,
            ErrorKind::Validation
        );
        assert_eq!(
            forest.add_root(CategoryItem::archive_node()).unwrap_err().kind,
            ErrorKind::Validation
        );
    }
}
