//! The category store.
//!
//! Each top-level category lives in exactly one record file: `<name>.json`
//! when unprotected, `<name>.enc` when protected. Saving in one form removes
//! the other so two divergent copies never coexist. Writes and deletes for the
//! same category are serialized through a per-name async mutex.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use serde::Deserialize;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use linkvault_auth::PasswordCache;
use linkvault_auth::crypto;
use linkvault_core::config::store::StoreConfig;
use linkvault_core::errlog::ErrorLog;
use linkvault_core::error::{AppError, ErrorKind};
use linkvault_entity::record::{ENVELOPE_FORMAT, ENVELOPE_VERSION};
use linkvault_entity::{CategoryItem, EncryptedEnvelope, PasswordProtection};

use crate::files::{self, DiscoveredRecord, RecordFiles, RecordForm};
use crate::report::{LoadFailure, LoadReport, LockedCategory, RootEntry};

/// Outcome of decoding one record's bytes.
enum Decoded {
    Category(CategoryItem),
    Locked(LockedCategory),
}

/// Loads, saves, and deletes top-level category records.
#[derive(Debug)]
pub struct CategoryStore {
    /// Record naming scheme.
    files: RecordFiles,
    /// Session passwords.
    passwords: PasswordCache,
    /// Operator error log.
    errors: Arc<ErrorLog>,
    /// Per-category write locks.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl CategoryStore {
    /// Create a store rooted at the configured data directory.
    pub async fn new(
        config: &StoreConfig,
        passwords: PasswordCache,
        errors: Arc<ErrorLog>,
    ) -> Result<Self, AppError> {
        let files = RecordFiles::new(config);
        files.ensure_root().await?;
        Ok(Self {
            files,
            passwords,
            errors,
            locks: DashMap::new(),
        })
    }

    /// The password cache this store consults.
    pub fn passwords(&self) -> &PasswordCache {
        &self.passwords
    }

    /// The error log failures are recorded to.
    pub fn error_log(&self) -> &Arc<ErrorLog> {
        &self.errors
    }

    /// Data directory.
    pub fn data_dir(&self) -> &Path {
        self.files.root()
    }

    /// Cache the global password.
    pub async fn cache_global_password(&self, password: &str) -> Result<(), AppError> {
        self.passwords.cache_global_password(password).await
    }

    /// Cache a category's own password.
    pub async fn cache_category_password(
        &self,
        category_path: &str,
        password: &str,
    ) -> Result<(), AppError> {
        self.passwords
            .cache_category_password(category_path, password)
            .await
    }

    /// Drop the password slot that `protection` resolves to for `name`.
    pub async fn forget_password(&self, name: &str, protection: PasswordProtection) {
        match protection {
            PasswordProtection::GlobalPassword => self.passwords.forget_global().await,
            PasswordProtection::OwnPassword => self.passwords.forget_category(name).await,
            PasswordProtection::None => {}
        }
    }

    /// Drop every cached password.
    pub async fn clear_password_cache(&self) {
        self.passwords.clear().await;
    }

    /// Scan the data directory and reconstruct every top-level category.
    ///
    /// A malformed or unreadable record is skipped and reported; it never
    /// aborts the rest of the load. A protected record whose password is
    /// missing or wrong is returned as a [`RootEntry::Locked`] placeholder.
    pub async fn load_all(&self) -> Result<LoadReport, AppError> {
        let discovered = self.scan().await?;
        let mut report = LoadReport::default();

        for record in discovered {
            let bytes = match fs::read(&record.path).await {
                Ok(b) => b,
                Err(e) => {
                    let err = AppError::with_source(
                        ErrorKind::Storage,
                        format!("Failed to read record: {}", record.path.display()),
                        e,
                    );
                    self.isolate(&mut report, &record.path, err);
                    continue;
                }
            };

            match self.decode(&bytes, &record.path).await {
                Ok(Decoded::Category(category)) => {
                    debug!(category = %category.name, "Loaded category");
                    report.roots.push(RootEntry::Unlocked(category));
                }
                Ok(Decoded::Locked(locked)) => {
                    debug!(category = %locked.name, "Category locked");
                    report.roots.push(RootEntry::Locked(locked));
                }
                Err((locked, err)) => {
                    self.isolate(&mut report, &record.path, err);
                    if let Some(locked) = locked {
                        report.roots.push(RootEntry::Locked(locked));
                    }
                }
            }
        }

        report.roots.sort_by(|a, b| a.name().cmp(b.name()));
        info!(
            roots = report.roots.len(),
            locked = report.locked().count(),
            failures = report.failures.len(),
            "Loaded category records"
        );
        Ok(report)
    }

    /// Re-read a single protected record after its password was cached.
    ///
    /// Fails with [`ErrorKind::Locked`] if no password is cached and with
    /// [`ErrorKind::Cryptographic`] if the password is wrong.
    pub async fn unlock(&self, name: &str) -> Result<CategoryItem, AppError> {
        let enc_path = self.files.path_for(name, RecordForm::Encrypted);
        let plain_path = self.files.path_for(name, RecordForm::Plain);
        let path = if fs::try_exists(&enc_path).await.unwrap_or(false) {
            enc_path
        } else {
            plain_path
        };

        let bytes = fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("Category '{name}' has no record"))
            } else {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to read record: {}", path.display()),
                    e,
                )
            }
        })?;

        match self.decode(&bytes, &path).await {
            Ok(Decoded::Category(category)) => Ok(category),
            Ok(Decoded::Locked(_)) => Err(AppError::locked(format!(
                "No password available for category '{name}'"
            ))),
            Err((_, err)) => {
                let path_str = path.display().to_string();
                self.errors
                    .record("unlock", &err, &[("file", &path_str), ("category", name)]);
                Err(err)
            }
        }
    }

    /// Persist a top-level category and its subtree.
    ///
    /// Encrypts with the resolved own or global password when protected.
    /// After a successful write the alternate artifact form is removed.
    pub async fn save(&self, category: &CategoryItem) -> Result<PathBuf, AppError> {
        category.validate(true)?;

        let lock = self.lock_for(&category.name);
        let _guard = lock.lock().await;

        let result = self.save_locked(category).await;
        if let Err(err) = &result {
            self.errors
                .record("save", err, &[("category", &category.name)]);
        }
        result
    }

    async fn save_locked(&self, category: &CategoryItem) -> Result<PathBuf, AppError> {
        self.check_record_owner(&category.name).await?;
        let json = serde_json::to_vec_pretty(category)?;
        let protection = category.password_protection;

        let (form, bytes) = if protection.is_protected() {
            let password = self
                .passwords
                .resolve(&category.name, protection)
                .await
                .ok_or_else(|| {
                    AppError::locked(format!(
                        "No password available to encrypt category '{}'",
                        category.name
                    ))
                })?;
            let sealed = crypto::encrypt(&json, &password)?;
            let envelope = EncryptedEnvelope {
                format: ENVELOPE_FORMAT.to_string(),
                version: ENVELOPE_VERSION,
                name: category.name.clone(),
                protection,
                salt: sealed.salt,
                nonce: sealed.nonce,
                tag: sealed.tag,
                ciphertext: sealed.ciphertext,
            };
            (RecordForm::Encrypted, serde_json::to_vec_pretty(&envelope)?)
        } else {
            (RecordForm::Plain, json)
        };

        let path = self.files.path_for(&category.name, form);
        files::write_atomic(&path, &bytes).await?;

        let stale = self.files.path_for(&category.name, form.alternate());
        if files::remove_if_exists(&stale).await? {
            info!(category = %category.name, stale = %stale.display(), "Removed stale record form");
        }

        info!(
            category = %category.name,
            encrypted = protection.is_protected(),
            "Saved category"
        );
        Ok(path)
    }

    /// Remove both artifact forms of a category. Idempotent.
    pub async fn delete(&self, name: &str) -> Result<(), AppError> {
        let lock = self.lock_for(name);
        let _guard = lock.lock().await;

        if let Err(err) = self.check_record_owner(name).await {
            self.errors.record("delete", &err, &[("category", name)]);
            return Err(err);
        }
        for form in [RecordForm::Plain, RecordForm::Encrypted] {
            let path = self.files.path_for(name, form);
            if let Err(err) = files::remove_if_exists(&path).await {
                let path_str = path.display().to_string();
                self.errors
                    .record("delete", &err, &[("file", &path_str), ("category", name)]);
                return Err(err);
            }
        }
        info!(category = %name, "Deleted category records");
        Ok(())
    }

    /// Paths of the record artifacts currently present for `name`.
    pub async fn artifacts(&self, name: &str) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for form in [RecordForm::Plain, RecordForm::Encrypted] {
            let path = self.files.path_for(name, form);
            if fs::try_exists(&path).await.unwrap_or(false) {
                found.push(path);
            }
        }
        found
    }

    /// Refuse to touch record files that hold a different category, which
    /// happens when the filesystem folds names that differ only in case.
    async fn check_record_owner(&self, name: &str) -> Result<(), AppError> {
        for form in [RecordForm::Plain, RecordForm::Encrypted] {
            let path = self.files.path_for(name, form);
            let Ok(bytes) = fs::read(&path).await else {
                continue;
            };
            if let Some(owner) = stored_name(&bytes).filter(|owner| owner != name) {
                return Err(AppError::validation(format!(
                    "Record {} belongs to category '{owner}', not '{name}'",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    fn lock_for(&self, name: &str) -> Arc<Mutex<()>> {
        self.locks.entry(name.to_string()).or_default().clone()
    }

    fn isolate(&self, report: &mut LoadReport, path: &Path, err: AppError) {
        let path_str = path.display().to_string();
        self.errors.record("load_all", &err, &[("file", &path_str)]);
        report.failures.push(LoadFailure {
            path: path.to_path_buf(),
            error: err,
        });
    }

    /// List record files, one per category, removing interrupted temp files.
    ///
    /// If both forms of the same category are present the newer one wins.
    async fn scan(&self) -> Result<Vec<DiscoveredRecord>, AppError> {
        let root = self.files.root();
        let mut dir = fs::read_dir(root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to list data directory: {}", root.display()),
                e,
            )
        })?;

        let mut by_stem: BTreeMap<String, (DiscoveredRecord, SystemTime)> = BTreeMap::new();
        while let Some(entry) = dir.next_entry().await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to read directory entry", e)
        })? {
            let path = entry.path();
            if files::is_temp_file(&path) {
                warn!(path = %path.display(), "Removing interrupted write");
                let _ = files::remove_if_exists(&path).await;
                continue;
            }
            let Some(record) = self.files.classify(&path) else {
                continue;
            };
            let modified = entry
                .metadata()
                .await
                .ok()
                .and_then(|m| m.modified().ok())
                .unwrap_or(SystemTime::UNIX_EPOCH);

            match by_stem.get(&record.stem) {
                Some((existing, existing_modified)) => {
                    let newer = modified > *existing_modified;
                    let kept = if newer { &record.path } else { &existing.path };
                    warn!(
                        category = %files::decode_file_stem(&record.stem),
                        kept = %kept.display(),
                        "Both record forms present"
                    );
                    if newer {
                        by_stem.insert(record.stem.clone(), (record, modified));
                    }
                }
                None => {
                    by_stem.insert(record.stem.clone(), (record, modified));
                }
            }
        }

        Ok(by_stem.into_values().map(|(r, _)| r).collect())
    }

    /// Decode record bytes: plaintext first, then the encrypted envelope.
    ///
    /// On failure returns the locked placeholder (if the record was an
    /// envelope) alongside the error.
    async fn decode(
        &self,
        bytes: &[u8],
        path: &Path,
    ) -> Result<Decoded, (Option<LockedCategory>, AppError)> {
        let Some(envelope) = EncryptedEnvelope::detect(bytes) else {
            return serde_json::from_slice::<CategoryItem>(bytes)
                .map(Decoded::Category)
                .map_err(|e| {
                    (
                        None,
                        AppError::with_source(
                            ErrorKind::Serialization,
                            format!("Malformed record: {}", path.display()),
                            e,
                        ),
                    )
                });
        };

        let locked = LockedCategory {
            name: envelope.name.clone(),
            protection: envelope.protection,
            path: path.to_path_buf(),
        };

        let Some(password) = self
            .passwords
            .resolve(&envelope.name, envelope.protection)
            .await
        else {
            return Ok(Decoded::Locked(locked));
        };

        let plaintext = crypto::decrypt(
            &envelope.ciphertext,
            &envelope.salt,
            &envelope.nonce,
            &envelope.tag,
            &password,
        )
        .map_err(|e| (Some(locked.clone()), AppError::from(e)))?;

        serde_json::from_slice::<CategoryItem>(&plaintext)
            .map(Decoded::Category)
            .map_err(|e| {
                (
                    Some(locked),
                    AppError::with_source(
                        ErrorKind::Serialization,
                        format!("Malformed decrypted record: {}", path.display()),
                        e,
                    ),
                )
            })
    }
}

/// The category name recorded in a record's bytes, if they parse.
fn stored_name(bytes: &[u8]) -> Option<String> {
    #[derive(Deserialize)]
    struct NameOnly {
        name: String,
    }

    match EncryptedEnvelope::detect(bytes) {
        Some(envelope) => Some(envelope.name),
        None => serde_json::from_slice::<NameOnly>(bytes).ok().map(|r| r.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkvault_entity::{LinkItem, PasswordProtection};

    async fn make_store(dir: &Path) -> CategoryStore {
        let config = StoreConfig {
            data_dir: dir.to_string_lossy().to_string(),
            ..StoreConfig::default()
        };
        CategoryStore::new(&config, PasswordCache::new(), Arc::new(ErrorLog::in_memory()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_save_and_load_plain() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path()).await;
        let cat = CategoryItem::new("Reading")
            .with_link(LinkItem::new_url("Rust", "https://www.rust-lang.org"));

        let path = store.save(&cat).await.unwrap();
        assert!(path.ends_with("Reading.json"));

        let report = store.load_all().await.unwrap();
        assert_eq!(report.roots.len(), 1);
        assert_eq!(report.roots[0].as_category().unwrap(), &cat);
    }

    #[tokio::test]
    async fn test_save_protected_without_password_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path()).await;
        let cat = CategoryItem::new("Private").with_protection(PasswordProtection::OwnPassword);

        let err = store.save(&cat).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Locked);
        assert!(store.artifacts("Private").await.is_empty());
        assert_eq!(store.error_log().len(), 1);
    }

    #[tokio::test]
    async fn test_interrupted_write_is_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path()).await;
        std::fs::write(dir.path().join("Half.json.tmp"), b"{\"na").unwrap();

        let report = store.load_all().await.unwrap();
        assert!(report.roots.is_empty());
        assert!(report.failures.is_empty());
        assert!(!dir.path().join("Half.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_invalid_category_is_rejected_before_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path()).await;
        let cat = CategoryItem::new("Dupes")
            .with_category(CategoryItem::new("x"))
            .with_category(CategoryItem::new("x"));
        let err = store.save(&cat).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(store.artifacts("Dupes").await.is_empty());
    }
}
