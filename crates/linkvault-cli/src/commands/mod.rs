//! CLI command definitions and dispatch.

pub mod catalog;
pub mod check;
pub mod security;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use linkvault_auth::PasswordCache;
use linkvault_core::config::AppConfig;
use linkvault_core::errlog::ErrorLog;
use linkvault_core::error::{AppError, ErrorKind};
use linkvault_entity::PasswordProtection;
use linkvault_service::{CatalogService, NodeData, NodeId, PATH_SEPARATOR};
use linkvault_storage::CategoryStore;

use crate::output::{self, OutputFormat};

/// Attempts allowed when a prompted password is wrong.
const UNLOCK_ATTEMPTS: usize = 3;

/// LinkVault: a personal archive of categorized links and files
#[derive(Debug, Parser)]
#[command(name = "linkvault", version, about, long_about = None)]
pub struct Cli {
    /// Base configuration file (extension optional)
    #[arg(short, long, default_value = "config/default")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List top-level categories
    List,
    /// Show a category and everything below it
    Tree(catalog::TreeArgs),
    /// Check every web link below a category
    Check(check::CheckArgs),
    /// Create a category
    NewCategory(catalog::NewCategoryArgs),
    /// Add a link or file to a category
    AddLink(catalog::AddLinkArgs),
    /// Delete a top-level category and its record
    Delete(catalog::DeleteArgs),
    /// Move a link into the archive
    ArchiveLink(catalog::ArchiveLinkArgs),
    /// Move a category into the archive
    ArchiveCategory(catalog::ArchiveCategoryArgs),
    /// Unlock a protected category
    Unlock(security::UnlockArgs),
    /// Change how a top-level category is protected
    Protect(security::ProtectArgs),
    /// Forget all cached passwords
    Lock,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> Result<(), AppError> {
        let session = Session::open(config).await?;
        match &self.command {
            Commands::List => catalog::list(&session, self.format).await,
            Commands::Tree(args) => catalog::tree(&session, args, self.format).await,
            Commands::Check(args) => check::execute(&session, args, self.format).await,
            Commands::NewCategory(args) => catalog::new_category(&session, args).await,
            Commands::AddLink(args) => catalog::add_link(&session, args).await,
            Commands::Delete(args) => catalog::delete(&session, args).await,
            Commands::ArchiveLink(args) => catalog::archive_link(&session, args).await,
            Commands::ArchiveCategory(args) => catalog::archive_category(&session, args).await,
            Commands::Unlock(args) => security::unlock(&session, args).await,
            Commands::Protect(args) => security::protect(&session, args).await,
            Commands::Lock => security::lock(&session).await,
        }
    }
}

/// Everything a command needs: configuration and a loaded catalog.
#[derive(Debug)]
pub struct Session {
    /// Effective configuration.
    pub config: AppConfig,
    /// Loaded catalog.
    pub catalog: CatalogService,
}

impl Session {
    /// Open the store and load every record, reporting skipped ones.
    pub async fn open(config: AppConfig) -> Result<Self, AppError> {
        let errors = Arc::new(ErrorLog::new(&config.logging.error_log));
        let store = CategoryStore::new(&config.store, PasswordCache::new(), errors).await?;
        let catalog = CatalogService::new(Arc::new(store));

        for failure in catalog.load().await? {
            output::print_warning(&format!(
                "Skipped {}: {}",
                failure.path.display(),
                failure.error
            ));
        }
        Ok(Self { config, catalog })
    }

    /// Resolve a dotted category path, prompting to unlock its top-level
    /// category first if needed.
    pub async fn resolve_unlocked(&self, path: &str) -> Result<NodeId, AppError> {
        let root = path.split(PATH_SEPARATOR).next().unwrap_or(path);
        self.ensure_unlocked(root).await?;
        self.catalog.resolve(path).await
    }

    /// Prompt for the password of a locked top-level category until it
    /// unlocks or the attempts run out.
    pub async fn ensure_unlocked(&self, name: &str) -> Result<(), AppError> {
        let protection = {
            let forest = self.catalog.forest();
            let forest = forest.read().await;
            let id = forest
                .find_root(name)
                .ok_or_else(|| AppError::not_found(format!("Category '{name}' does not exist")))?;
            match forest.data(id) {
                Some(NodeData::Locked(locked)) => locked.protection,
                _ => return Ok(()),
            }
        };

        for attempt in 1..=UNLOCK_ATTEMPTS {
            let password = prompt_password(&unlock_prompt(name, protection), false)?;
            self.cache_password(name, protection, &password).await?;
            match self.catalog.unlock(name).await {
                Ok(_) => return Ok(()),
                Err(e) if e.is(ErrorKind::Cryptographic) => {
                    self.catalog.store().forget_password(name, protection).await;
                    if attempt == UNLOCK_ATTEMPTS {
                        return Err(e);
                    }
                    output::print_warning("Wrong password, try again.");
                }
                Err(e) => return Err(e),
            }
        }
        Err(AppError::locked(format!("Category '{name}' is still locked")))
    }

    /// Whether a top-level category with this name is loaded.
    pub async fn has_root(&self, name: &str) -> bool {
        self.catalog.forest().read().await.find_root(name).is_some()
    }

    /// Put a password into the slot that `protection` resolves to.
    pub async fn cache_password(
        &self,
        name: &str,
        protection: PasswordProtection,
        password: &str,
    ) -> Result<(), AppError> {
        let store = self.catalog.store();
        match protection {
            PasswordProtection::GlobalPassword => store.cache_global_password(password).await,
            PasswordProtection::OwnPassword => store.cache_category_password(name, password).await,
            PasswordProtection::None => Ok(()),
        }
    }
}

fn unlock_prompt(name: &str, protection: PasswordProtection) -> String {
    match protection {
        PasswordProtection::GlobalPassword => format!("Global password (to open '{name}')"),
        _ => format!("Password for '{name}'"),
    }
}

/// Read a password from the terminal without echo.
pub fn prompt_password(prompt: &str, confirm: bool) -> Result<String, AppError> {
    let mut input = dialoguer::Password::new().with_prompt(prompt);
    if confirm {
        input = input.with_confirmation("Repeat password", "Passwords do not match");
    }
    input
        .interact()
        .map_err(|e| AppError::internal(format!("Failed to read password: {e}")))
}

/// Ask a yes/no question, defaulting to no.
pub fn confirm(prompt: &str) -> Result<bool, AppError> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| AppError::internal(format!("Failed to read answer: {e}")))
}
