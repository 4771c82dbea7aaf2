//! Password and protection commands.

use clap::{Args, ValueEnum};

use linkvault_core::error::{AppError, ErrorKind};
use linkvault_entity::{ARCHIVE_NODE_NAME, PasswordProtection};
use linkvault_service::NodeData;

use super::catalog::protection_label;
use super::{Session, UNLOCK_ATTEMPTS, prompt_password};
use crate::output;

/// Arguments for `unlock`
#[derive(Debug, Args)]
pub struct UnlockArgs {
    /// Top-level category name
    pub name: String,
}

/// Protection modes accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProtectionMode {
    /// Store in plaintext
    None,
    /// Encrypt with the global password
    Global,
    /// Encrypt with a password for this category only
    Own,
}

impl From<ProtectionMode> for PasswordProtection {
    fn from(mode: ProtectionMode) -> Self {
        match mode {
            ProtectionMode::None => Self::None,
            ProtectionMode::Global => Self::GlobalPassword,
            ProtectionMode::Own => Self::OwnPassword,
        }
    }
}

/// Arguments for `protect`
#[derive(Debug, Args)]
pub struct ProtectArgs {
    /// Top-level category name
    pub name: String,
    /// New protection mode
    #[arg(short, long, value_enum)]
    pub mode: ProtectionMode,
}

/// Unlock a protected category
pub async fn unlock(session: &Session, args: &UnlockArgs) -> Result<(), AppError> {
    session.ensure_unlocked(&args.name).await?;
    output::print_success(&format!("'{}' is unlocked", args.name));
    Ok(())
}

/// Change a category's protection and re-save it
pub async fn protect(session: &Session, args: &ProtectArgs) -> Result<(), AppError> {
    if args.name != ARCHIVE_NODE_NAME || session.has_root(&args.name).await {
        session.ensure_unlocked(&args.name).await?;
    }
    let protection = PasswordProtection::from(args.mode);

    match protection {
        PasswordProtection::GlobalPassword => ensure_global_password(session).await?,
        PasswordProtection::OwnPassword => {
            let prompt = format!("New password for '{}'", args.name);
            let password = prompt_password(&prompt, true)?;
            session
                .cache_password(&args.name, protection, &password)
                .await?;
        }
        PasswordProtection::None => {}
    }

    session.catalog.set_protection(&args.name, protection).await?;
    output::print_success(&format!(
        "'{}' is now protected with: {}",
        args.name,
        protection_label(protection)
    ));
    Ok(())
}

/// Make sure the cached global password is the one existing records are
/// sealed with. The first global password is asked for twice instead.
async fn ensure_global_password(session: &Session) -> Result<(), AppError> {
    let store = session.catalog.store();
    if store.passwords().has_global_password().await {
        return Ok(());
    }
    if !session.catalog.has_global_records().await {
        let password = prompt_password("New global password", true)?;
        return store.cache_global_password(&password).await;
    }

    for attempt in 1..=UNLOCK_ATTEMPTS {
        let password = prompt_password("Global password", false)?;
        store.cache_global_password(&password).await?;
        match session.catalog.verify_global_password().await {
            Ok(_) => return Ok(()),
            Err(e) if e.is(ErrorKind::Cryptographic) && attempt < UNLOCK_ATTEMPTS => {
                output::print_warning("Wrong password, try again.");
            }
            Err(e) => return Err(e),
        }
    }
    Err(AppError::locked("The global password could not be verified"))
}

/// Forget cached passwords and show which categories are locked again
pub async fn lock(session: &Session) -> Result<(), AppError> {
    session.catalog.lock().await?;

    let forest = session.catalog.forest();
    let forest = forest.read().await;
    let locked: Vec<&str> = forest
        .roots()
        .iter()
        .filter_map(|&id| match forest.data(id) {
            Some(NodeData::Locked(l)) => Some(l.name.as_str()),
            _ => None,
        })
        .collect();

    output::print_success("Password cache cleared");
    if !locked.is_empty() {
        output::print_kv("Locked", &locked.join(", "));
    }
    Ok(())
}
