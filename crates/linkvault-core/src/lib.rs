//! # linkvault-core
//!
//! Core crate for LinkVault. Contains configuration schemas, the unified
//! error system, and the append-only operator error log.
//!
//! This crate has **no** internal dependencies on other LinkVault crates.

pub mod config;
pub mod errlog;
pub mod error;
pub mod result;

pub use errlog::ErrorLog;
pub use error::{AppError, ErrorKind};
pub use result::AppResult;
