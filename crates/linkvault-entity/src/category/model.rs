//! Category entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use linkvault_core::error::AppError;

use super::link::LinkItem;

/// Display name of the synthetic archive category.
pub const ARCHIVE_NODE_NAME: &str = "Archive";

/// Separator between category names in a dotted path.
pub const PATH_SEPARATOR: &str = ".";

/// How a category's record is protected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PasswordProtection {
    /// Stored in plaintext.
    #[default]
    None,
    /// Encrypted with the single session-wide global password.
    GlobalPassword,
    /// Encrypted with a password specific to this category.
    OwnPassword,
}

impl PasswordProtection {
    /// Whether the record must be encrypted.
    pub fn is_protected(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// A named node in the hierarchical catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryItem {
    /// Category name, unique among its siblings.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Icon identifier chosen by the user.
    #[serde(default)]
    pub icon: String,
    /// Ordered subcategories.
    #[serde(default)]
    pub categories: Vec<CategoryItem>,
    /// Links held directly by this category.
    #[serde(default)]
    pub links: Vec<LinkItem>,
    /// Record protection mode.
    #[serde(default)]
    pub password_protection: PasswordProtection,
    /// Marks the synthetic root-level archive category.
    #[serde(default)]
    pub is_archive_node: bool,
    /// Set when the category was moved into the archive.
    #[serde(default)]
    pub archived_date: Option<DateTime<Utc>>,
}

impl CategoryItem {
    /// Create an empty, unprotected category.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            icon: String::new(),
            categories: Vec::new(),
            links: Vec::new(),
            password_protection: PasswordProtection::None,
            is_archive_node: false,
            archived_date: None,
        }
    }

    /// Create the synthetic archive category.
    pub fn archive_node() -> Self {
        Self {
            is_archive_node: true,
            icon: "archive".to_string(),
            ..Self::new(ARCHIVE_NODE_NAME)
        }
    }

    /// Builder-style protection setter.
    pub fn with_protection(mut self, protection: PasswordProtection) -> Self {
        self.password_protection = protection;
        self
    }

    /// Builder-style child category append.
    pub fn with_category(mut self, child: CategoryItem) -> Self {
        self.categories.push(child);
        self
    }

    /// Builder-style link append.
    pub fn with_link(mut self, link: LinkItem) -> Self {
        self.links.push(link);
        self
    }

    /// Find a direct subcategory by name.
    pub fn find_category(&self, name: &str) -> Option<&CategoryItem> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Total number of links in this category and all descendants.
    pub fn link_count(&self) -> usize {
        self.links.len() + self.categories.iter().map(|c| c.link_count()).sum::<usize>()
    }

    /// Check structural invariants of this subtree.
    ///
    /// `at_root` tells whether this category is a top-level category. Only a
    /// top-level category may carry the archive marker or a protection mode,
    /// since one record holds the whole subtree.
    pub fn validate(&self, at_root: bool) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("Category name must not be empty"));
        }
        if self.name.contains(PATH_SEPARATOR) {
            return Err(AppError::validation(format!(
                "Category name '{}' must not contain '{PATH_SEPARATOR}'",
                self.name
            )));
        }
        if self.password_protection.is_protected() && !at_root {
            return Err(AppError::validation(format!(
                "Only top-level categories can be protected, '{}' is nested",
                self.name
            )));
        }
        if self.is_archive_node && !at_root {
            return Err(AppError::validation(format!(
                "Category '{}' is marked as archive but is not top-level",
                self.name
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for child in &self.categories {
            if !seen.insert(child.name.as_str()) {
                return Err(AppError::validation(format!(
                    "Duplicate subcategory '{}' in '{}'",
                    child.name, self.name
                )));
            }
            child.validate(false)?;
        }

        for link in &self.links {
            if link.target.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "Link '{}' in '{}' has an empty target",
                    link.title, self.name
                )));
            }
        }
        Ok(())
    }
}
