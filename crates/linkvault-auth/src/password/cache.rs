//! In-memory session password cache.
//!
//! Holds plaintext passwords for the lifetime of an unlocked session only.
//! Nothing here is ever written to disk. The cache is an explicitly
//! constructed component: create it at session start, hand clones to the
//! store and the unlock flow, and call [`PasswordCache::clear`] on lock.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use linkvault_core::error::AppError;
use linkvault_entity::PasswordProtection;

/// Cache slot identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Slot {
    /// The one global password.
    Global,
    /// A category's own password, keyed by full dotted path.
    Category(String),
}

/// Process-wide password cache guarded by an async read/write lock.
///
/// Cloning is cheap and every clone shares the same slots.
#[derive(Clone, Default)]
pub struct PasswordCache {
    slots: Arc<RwLock<HashMap<Slot, String>>>,
}

impl fmt::Debug for PasswordCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCache").finish_non_exhaustive()
    }
}

impl PasswordCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the global password.
    pub async fn cache_global_password(&self, password: &str) -> Result<(), AppError> {
        ensure_non_empty(password)?;
        self.slots
            .write()
            .await
            .insert(Slot::Global, password.to_string());
        info!("Global password cached");
        Ok(())
    }

    /// Store a category's own password under its full dotted path.
    pub async fn cache_category_password(
        &self,
        category_path: &str,
        password: &str,
    ) -> Result<(), AppError> {
        ensure_non_empty(password)?;
        if category_path.is_empty() {
            return Err(AppError::validation("Category path must not be empty"));
        }
        self.slots
            .write()
            .await
            .insert(Slot::Category(category_path.to_string()), password.to_string());
        info!(category = %category_path, "Category password cached");
        Ok(())
    }

    /// Resolve the password for a category with the given protection.
    ///
    /// `GlobalPassword` always resolves to the global slot regardless of the
    /// path. `OwnPassword` only matches the exact path; a subcategory never
    /// inherits an ancestor's own password.
    pub async fn resolve(
        &self,
        category_path: &str,
        protection: PasswordProtection,
    ) -> Option<String> {
        let slot = match protection {
            PasswordProtection::None => return None,
            PasswordProtection::GlobalPassword => Slot::Global,
            PasswordProtection::OwnPassword => Slot::Category(category_path.to_string()),
        };
        let found = self.slots.read().await.get(&slot).cloned();
        debug!(category = %category_path, hit = found.is_some(), "Password cache lookup");
        found
    }

    /// Whether a password for the given category is available.
    ///
    /// Unprotected categories are always available.
    pub async fn is_available(&self, category_path: &str, protection: PasswordProtection) -> bool {
        !protection.is_protected() || self.resolve(category_path, protection).await.is_some()
    }

    /// Whether the global password has been supplied.
    pub async fn has_global_password(&self) -> bool {
        self.slots.read().await.contains_key(&Slot::Global)
    }

    /// Drop a single category's own password (e.g. after it failed to decrypt).
    pub async fn forget_category(&self, category_path: &str) {
        self.slots
            .write()
            .await
            .remove(&Slot::Category(category_path.to_string()));
    }

    /// Drop the global password.
    pub async fn forget_global(&self) {
        self.slots.write().await.remove(&Slot::Global);
    }

    /// Drop every cached password (lock / log out).
    pub async fn clear(&self) {
        let mut slots = self.slots.write().await;
        let count = slots.len();
        slots.clear();
        info!(count, "Password cache cleared");
    }

    /// Number of cached passwords.
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    /// Whether the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }
}

fn ensure_non_empty(password: &str) -> Result<(), AppError> {
    if password.is_empty() {
        return Err(AppError::validation("Password must not be empty"));
    }
    Ok(())
}
