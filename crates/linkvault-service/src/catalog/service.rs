//! Keeps the in-memory forest and the category store in step.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use linkvault_core::error::AppError;
use linkvault_core::result::AppResult;
use linkvault_entity::{ARCHIVE_NODE_NAME, CategoryItem, LinkItem, PasswordProtection};
use linkvault_storage::{CategoryStore, LoadFailure};

use crate::tree::{Forest, NodeData, NodeId};

/// Forest shared between the catalog and the health-check engine.
pub type SharedForest = Arc<RwLock<Forest>>;

/// Catalog operations that touch both the forest and the persisted records.
///
/// Every mutation is applied to the forest first and then written through to
/// the store. If the write fails the forest is rolled back to its previous
/// state, so node ids handed out before the call stay valid.
#[derive(Debug, Clone)]
pub struct CatalogService {
    /// Persisted records.
    store: Arc<CategoryStore>,
    /// In-memory projection.
    forest: SharedForest,
}

impl CatalogService {
    /// Creates a catalog over `store` with an empty forest.
    pub fn new(store: Arc<CategoryStore>) -> Self {
        Self {
            store,
            forest: Arc::new(RwLock::new(Forest::new())),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<CategoryStore> {
        &self.store
    }

    /// Handle to the shared forest.
    pub fn forest(&self) -> SharedForest {
        Arc::clone(&self.forest)
    }

    /// Reload every record and rebuild the forest.
    ///
    /// All previously issued node ids become stale. Returns the records that
    /// could not be loaded.
    pub async fn load(&self) -> AppResult<Vec<LoadFailure>> {
        let report = self.store.load_all().await?;
        let forest = Forest::from_report(&report);
        info!(
            roots = forest.roots().len(),
            locked = report.locked().count(),
            failures = report.failures.len(),
            "Catalog loaded"
        );
        *self.forest.write().await = forest;
        Ok(report.failures)
    }

    /// Resolve a dotted category path.
    pub async fn resolve(&self, path: &str) -> AppResult<NodeId> {
        self.forest
            .read()
            .await
            .find_by_path(path)
            .ok_or_else(|| AppError::not_found(format!("No category at '{path}'")))
    }

    /// Decrypt a locked top-level category with the cached password and
    /// expand it in the forest.
    pub async fn unlock(&self, name: &str) -> AppResult<NodeId> {
        let category = self.store.unlock(name).await?;
        let mut forest = self.forest.write().await;
        let id = match forest.find_root(name) {
            Some(existing) => forest.replace_subtree(existing, category)?,
            None => forest.add_root(category)?,
        };
        info!(category = %name, "Category unlocked");
        Ok(id)
    }

    /// Forget every cached password and reload, collapsing protected
    /// categories back to locked placeholders.
    pub async fn lock(&self) -> AppResult<Vec<LoadFailure>> {
        self.store.clear_password_cache().await;
        info!("Password cache cleared");
        self.load().await
    }

    /// Create and persist a new top-level category.
    pub async fn create_root(&self, category: CategoryItem) -> AppResult<NodeId> {
        let mut forest = self.forest.write().await;
        let id = forest.add_root(category)?;
        if let Err(e) = self.persist(&forest, id).await {
            forest.remove(id)?;
            return Err(e);
        }
        Ok(id)
    }

    /// Add a subcategory under `parent` and persist its top-level category.
    pub async fn add_category(&self, parent: NodeId, category: CategoryItem) -> AppResult<NodeId> {
        let mut forest = self.forest.write().await;
        let snapshot = forest.clone();
        let id = forest.add_category(parent, category)?;
        if let Err(e) = self.persist_containing(&forest, id).await {
            *forest = snapshot;
            return Err(e);
        }
        Ok(id)
    }

    /// Add a link under `parent` and persist its top-level category.
    pub async fn add_link(&self, parent: NodeId, link: LinkItem) -> AppResult<NodeId> {
        let mut forest = self.forest.write().await;
        let snapshot = forest.clone();
        let id = forest.add_link(parent, link)?;
        if let Err(e) = self.persist_containing(&forest, id).await {
            *forest = snapshot;
            return Err(e);
        }
        Ok(id)
    }

    /// Change how a top-level category is protected and re-save it.
    ///
    /// The matching password must already be cached. Naming the archive
    /// creates it if needed, so it can be protected before anything from a
    /// protected category is archived. Returns the refreshed root id.
    pub async fn set_protection(
        &self,
        name: &str,
        protection: PasswordProtection,
    ) -> AppResult<NodeId> {
        if !self.store.passwords().is_available(name, protection).await {
            return Err(AppError::locked(format!(
                "No password cached to protect '{name}'"
            )));
        }

        let mut forest = self.forest.write().await;
        let snapshot = forest.clone();
        let root = match forest.find_root(name) {
            Some(id) => id,
            None if name == ARCHIVE_NODE_NAME => forest.ensure_archive_node()?,
            None => {
                return Err(AppError::not_found(format!("Category '{name}' does not exist")));
            }
        };
        let mut updated = forest.to_category(root)?;
        updated.password_protection = protection;
        if let Err(e) = self.store.save(&updated).await {
            *forest = snapshot;
            return Err(e);
        }
        forest.refresh_node(root, NodeData::Category(updated))
    }

    /// Check the cached global password against a record that is already
    /// sealed with it.
    ///
    /// Returns `false` when no such record exists, so any password may
    /// become the global one. A wrong password is dropped from the cache and
    /// reported as a cryptographic error.
    pub async fn verify_global_password(&self) -> AppResult<bool> {
        let Some(name) = self.global_sealed_root().await else {
            return Ok(false);
        };

        match self.store.unlock(&name).await {
            Ok(_) => Ok(true),
            Err(e) => {
                self.store
                    .forget_password(&name, PasswordProtection::GlobalPassword)
                    .await;
                Err(e)
            }
        }
    }

    /// Whether any top-level category is sealed with the global password.
    pub async fn has_global_records(&self) -> bool {
        self.global_sealed_root().await.is_some()
    }

    async fn global_sealed_root(&self) -> Option<String> {
        let forest = self.forest.read().await;
        forest.roots().iter().find_map(|&id| {
            let data = forest.data(id)?;
            (data.protection() == Some(PasswordProtection::GlobalPassword))
                .then(|| data.name().to_string())
        })
    }

    /// Delete a top-level category and its record. Idempotent on disk.
    pub async fn delete_root(&self, name: &str) -> AppResult<()> {
        let mut forest = self.forest.write().await;
        let existing = forest.find_root(name);
        if existing.is_some() && existing == forest.archive_node() {
            return Err(AppError::validation("The archive category cannot be deleted"));
        }
        self.store.delete(name).await?;
        if let Some(id) = existing {
            forest.remove(id)?;
        }
        Ok(())
    }

    /// Move a link into the archive and persist both affected categories.
    pub async fn archive_link(&self, id: NodeId) -> AppResult<NodeId> {
        let mut forest = self.forest.write().await;
        let snapshot = forest.clone();
        let source = forest
            .root_of(id)
            .ok_or_else(|| AppError::not_found("Link does not exist"))?;
        let archive = forest.archive_link(id)?;

        if let Err(e) = self.write_archive_move(&forest, archive, source, None).await {
            *forest = snapshot;
            return Err(e);
        }
        Ok(archive)
    }

    /// Move a category into the archive and persist the affected categories.
    ///
    /// Archiving a top-level category deletes its own record.
    pub async fn archive_category(&self, id: NodeId) -> AppResult<NodeId> {
        let mut forest = self.forest.write().await;
        let snapshot = forest.clone();
        let source = forest
            .root_of(id)
            .ok_or_else(|| AppError::not_found("Category does not exist"))?;
        let removed_root = (source == id)
            .then(|| forest.data(id).map(|d| d.name().to_string()))
            .flatten();
        let archive = forest.archive_category(id)?;

        if let Err(e) = self
            .write_archive_move(&forest, archive, source, removed_root.as_deref())
            .await
        {
            *forest = snapshot;
            return Err(e);
        }
        Ok(archive)
    }

    /// Writes the archive before the source category.
    async fn write_archive_move(
        &self,
        forest: &Forest,
        archive: NodeId,
        source: NodeId,
        removed_root: Option<&str>,
    ) -> AppResult<()> {
        self.persist(forest, archive).await?;
        match removed_root {
            Some(name) => self.store.delete(name).await,
            None => self.persist(forest, source).await.map(|_| ()),
        }
        .inspect_err(|e| warn!(error = %e, "Archive move only partially persisted"))
    }

    async fn persist_containing(&self, forest: &Forest, id: NodeId) -> AppResult<PathBuf> {
        let root = forest
            .root_of(id)
            .ok_or_else(|| AppError::internal("Node has no top-level category"))?;
        self.persist(forest, root).await
    }

    async fn persist(&self, forest: &Forest, root: NodeId) -> AppResult<PathBuf> {
        let category = forest.to_category(root)?;
        self.store.save(&category).await
    }
}
