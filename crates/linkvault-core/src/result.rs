//! Convenience result type alias for LinkVault.

use crate::error::AppError;

/// A specialized `Result` type for LinkVault operations.
pub type AppResult<T> = Result<T, AppError>;
