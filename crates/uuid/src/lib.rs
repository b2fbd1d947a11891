//! File identity allocation.
//!
//! Every accepted upload gets a fresh identifier before any I/O happens. The identifier is the
//! only input to the on-disk name, so two uploads can never collide on storage even when clients
//! send the same original filename.
//!
//! ## Canonical identifier form
//! - Length: 36
//! - Lowercase hexadecimal groups separated by hyphens (8-4-4-4-12)
//! - Example: `52e6d62a-5a9f-43b5-9b37-d278a94663e2`
//!
//! This is the value you would get from `Uuid::new_v4().hyphenated().to_string()`. Externally
//! supplied identifiers (for example, a path segment in a lookup request) must already be in
//! canonical form; use [`FileId::parse`] to validate them.
//!
//! ## Storage names
//! A [`StorageName`] is the identifier plus the sanitised extension of the original filename:
//!
//! ```text
//! <project>/52e6d62a-5a9f-43b5-9b37-d278a94663e2.jpg
//! <project>/low_52e6d62a-5a9f-43b5-9b37-d278a94663e2.jpg   # low-resolution preview
//! ```

mod service;

pub use service::{sanitize_extension, FileId, IdentityAllocator, StorageName, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
