//! Metadata repository adapters.
//!
//! The upload pipeline only ever calls [`FileRepository::create`]; the read operations back the
//! list and lookup endpoints.
//!
//! - [`PgFileRepository`]: the production store, one `file_metadata` table in Postgres
//! - [`InMemoryFileRepository`]: process-local, for tests and dry runs

mod memory;
mod postgres;

pub use memory::InMemoryFileRepository;
pub use postgres::PgFileRepository;

use crate::error::RepositoryResult;
use crate::record::{FileRecord, NewFileRecord};
use async_trait::async_trait;
use omstorage_types::{FolderName, ProjectId};
use omstorage_uuid::FileId;

#[async_trait]
pub trait FileRepository: Send + Sync + std::fmt::Debug {
    /// Persists a new record and returns it with timestamps set.
    async fn create(&self, record: NewFileRecord) -> RepositoryResult<FileRecord>;

    /// Records of `project`, newest first, optionally restricted to one folder.
    async fn find_by_project(
        &self,
        project: &ProjectId,
        folder: Option<&FolderName>,
    ) -> RepositoryResult<Vec<FileRecord>>;

    /// # Errors
    ///
    /// Returns [`crate::RepositoryError::NotFound`] when no record has this id.
    async fn find_by_id(&self, id: FileId) -> RepositoryResult<FileRecord>;
}
