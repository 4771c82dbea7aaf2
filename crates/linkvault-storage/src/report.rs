//! Results of loading the record namespace.

use std::path::PathBuf;

use linkvault_core::error::AppError;
use linkvault_entity::{CategoryItem, PasswordProtection};

/// A protected category whose password is unavailable or wrong.
///
/// Visible in the catalog but not expandable until unlocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedCategory {
    /// Category name from the envelope's cleartext header.
    pub name: String,
    /// Protection mode from the envelope's cleartext header.
    pub protection: PasswordProtection,
    /// Path of the encrypted record.
    pub path: PathBuf,
}

/// One top-level category as produced by [`CategoryStore::load_all`].
///
/// [`CategoryStore::load_all`]: crate::CategoryStore::load_all
#[derive(Debug, Clone, PartialEq)]
pub enum RootEntry {
    /// Fully loaded category.
    Unlocked(CategoryItem),
    /// Placeholder for a category that could not be decrypted.
    Locked(LockedCategory),
}

impl RootEntry {
    /// Category name.
    pub fn name(&self) -> &str {
        match self {
            Self::Unlocked(c) => &c.name,
            Self::Locked(l) => &l.name,
        }
    }

    /// Protection mode.
    pub fn protection(&self) -> PasswordProtection {
        match self {
            Self::Unlocked(c) => c.password_protection,
            Self::Locked(l) => l.protection,
        }
    }

    /// Whether the entry is a locked placeholder.
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked(_))
    }

    /// The loaded category, if unlocked.
    pub fn as_category(&self) -> Option<&CategoryItem> {
        match self {
            Self::Unlocked(c) => Some(c),
            Self::Locked(_) => None,
        }
    }
}

/// A record that could not be loaded.
#[derive(Debug, Clone)]
pub struct LoadFailure {
    /// The offending record file.
    pub path: PathBuf,
    /// Categorized cause.
    pub error: AppError,
}

/// Outcome of a full load: every usable root plus every isolated failure.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Loaded or locked top-level categories, ordered by name.
    pub roots: Vec<RootEntry>,
    /// Records that were skipped or could not be decrypted.
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    /// Iterate over the unlocked categories only.
    pub fn unlocked(&self) -> impl Iterator<Item = &CategoryItem> {
        self.roots.iter().filter_map(RootEntry::as_category)
    }

    /// Iterate over the locked placeholders only.
    pub fn locked(&self) -> impl Iterator<Item = &LockedCategory> {
        self.roots.iter().filter_map(|r| match r {
            RootEntry::Locked(l) => Some(l),
            RootEntry::Unlocked(_) => None,
        })
    }

    /// Find a root by name.
    pub fn find(&self, name: &str) -> Option<&RootEntry> {
        self.roots.iter().find(|r| r.name() == name)
    }
}
