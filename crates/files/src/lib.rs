//! omstorage blob storage
//!
//! This crate stores the raw bytes of uploads. It knows nothing about metadata, previews or
//! URLs; callers hand it a project and a generated object name and get back the location the
//! bytes were written to.
//!
//! ## Storage model
//!
//! - One container (a directory, for the local store) per project
//! - Objects are immutable once written; a write never replaces an existing object
//! - Object names are generated by the caller and must be a single path segment
//!
//! ```text
//! <storage_root>/
//! └── <project_id>/
//!     ├── 52e6d62a-5a9f-43b5-9b37-d278a94663e2.jpg
//!     └── low_52e6d62a-5a9f-43b5-9b37-d278a94663e2.jpg
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use omstorage_files::{BlobStore, LocalBlobStore};
//! use omstorage_types::ProjectId;
//! use std::path::Path;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = LocalBlobStore::new(Path::new("./uploads"))?;
//! let project = ProjectId::new("proj1")?;
//!
//! store.ensure_container(&project).await?;
//! let path = store
//!     .write_object(&project, "52e6d62a-5a9f-43b5-9b37-d278a94663e2.txt", "hi".into())
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod files;

pub use files::LocalBlobStore;

use async_trait::async_trait;
use bytes::Bytes;
use omstorage_types::ProjectId;
use std::path::PathBuf;

/// Errors that can occur during blob operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory does not exist or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// Object name is not a single safe path segment
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// An object with this name already exists (immutability violation)
    #[error("Object {0} already exists in storage")]
    ObjectAlreadyExists(String),

    /// Object does not exist
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable byte storage keyed by project and object name.
///
/// Implementations must make [`BlobStore::ensure_container`] idempotent and safe under
/// concurrent calls for the same project, and must never overwrite an object.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    /// Creates the container for `project` if it does not exist yet.
    async fn ensure_container(&self, project: &ProjectId) -> Result<(), FilesError>;

    /// Writes a new object and returns the location it was stored at.
    async fn write_object(
        &self,
        project: &ProjectId,
        name: &str,
        bytes: Bytes,
    ) -> Result<PathBuf, FilesError>;

    /// Reads back an existing object.
    async fn open_object(&self, project: &ProjectId, name: &str) -> Result<Bytes, FilesError>;
}
