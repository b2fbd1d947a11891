use super::FileRepository;
use crate::error::{RepositoryError, RepositoryResult};
use crate::record::{FileRecord, NewFileRecord};
use async_trait::async_trait;
use chrono::Utc;
use omstorage_types::{FolderName, ProjectId};
use omstorage_uuid::FileId;
use tokio::sync::RwLock;

/// Repository that keeps records in process memory, in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryFileRepository {
    records: RwLock<Vec<FileRecord>>,
}

impl InMemoryFileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl FileRepository for InMemoryFileRepository {
    async fn create(&self, record: NewFileRecord) -> RepositoryResult<FileRecord> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.id == record.id) {
            return Err(RepositoryError::InvalidRecord(format!(
                "duplicate id {}",
                record.id
            )));
        }

        let record = record.into_record(Utc::now());
        records.push(record.clone());
        Ok(record)
    }

    async fn find_by_project(
        &self,
        project: &ProjectId,
        folder: Option<&FolderName>,
    ) -> RepositoryResult<Vec<FileRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .filter(|r| r.project_id == project.as_str())
            .filter(|r| folder.map_or(true, |f| r.folder_name == f.as_str()))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: FileId) -> RepositoryResult<FileRecord> {
        let records = self.records.read().await;
        records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }
}
