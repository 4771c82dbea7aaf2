//! Category and link domain entities.

pub mod link;
pub mod model;
pub mod status;

pub use link::LinkItem;
pub use model::{ARCHIVE_NODE_NAME, CategoryItem, PATH_SEPARATOR, PasswordProtection};
pub use status::{Severity, StatusDescriptor, UrlStatus};
