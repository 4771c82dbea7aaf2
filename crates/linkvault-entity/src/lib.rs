//! # linkvault-entity
//!
//! Domain models for LinkVault. Every struct in this crate is a value object
//! that is persisted inside a category record (or, for [`record`], the
//! on-disk envelope itself). All models derive `Debug`, `Clone`,
//! `Serialize` and `Deserialize`; deserialization is tolerant of missing
//! fields so older records keep loading.

pub mod category;
pub mod record;

pub use category::{
    ARCHIVE_NODE_NAME, CategoryItem, LinkItem, PATH_SEPARATOR, PasswordProtection, Severity,
    StatusDescriptor, UrlStatus,
};
pub use record::EncryptedEnvelope;
