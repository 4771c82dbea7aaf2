//! Session password handling.

pub mod cache;

pub use cache::PasswordCache;
