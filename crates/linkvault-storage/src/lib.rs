//! # linkvault-storage
//!
//! The category store: one persisted record per top-level category, either
//! plaintext JSON or an encrypted envelope, written atomically and loaded with
//! per-record failure isolation.

pub mod files;
pub mod report;
pub mod store;

pub use report::{LoadFailure, LoadReport, LockedCategory, RootEntry};
pub use store::CategoryStore;
