use super::FileRepository;
use crate::config::DatabaseConfig;
use crate::constants::FILE_METADATA_TABLE;
use crate::error::{RepositoryError, RepositoryResult};
use crate::record::{FileRecord, NewFileRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use omstorage_types::{FolderName, ProjectId};
use omstorage_uuid::FileId;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;
use uuid::Uuid;

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_COLUMNS: &str = "id, project_id, folder_name, original_name, storage_path, \
     public_url, low_res_url, blur_hash, mime_type, size_bytes, created_at, updated_at";

/// File metadata in Postgres.
#[derive(Debug, Clone)]
pub struct PgFileRepository {
    pool: PgPool,
}

impl PgFileRepository {
    /// Creates a repository whose pool connects on first use.
    ///
    /// Construction never touches the network, so a server can start while the database is
    /// down; queries then fail through the normal error paths.
    pub fn connect_lazy(config: &DatabaseConfig) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_lazy_with(config.connect_options());
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the metadata table and its indexes if they do not exist.
    pub async fn migrate(&self) -> RepositoryResult<()> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id UUID PRIMARY KEY,
                project_id TEXT NOT NULL,
                folder_name TEXT NOT NULL DEFAULT 'default',
                original_name TEXT NOT NULL,
                storage_path TEXT NOT NULL UNIQUE,
                public_url TEXT NOT NULL,
                low_res_url TEXT NOT NULL DEFAULT '',
                blur_hash BYTEA NOT NULL DEFAULT ''::bytea,
                mime_type TEXT NOT NULL,
                size_bytes BIGINT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
            table = FILE_METADATA_TABLE
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_project_id ON {table} (project_id)",
            table = FILE_METADATA_TABLE
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_folder_name ON {table} (folder_name)",
            table = FILE_METADATA_TABLE
        ))
        .execute(&self.pool)
        .await?;

        tracing::info!(table = FILE_METADATA_TABLE, "metadata schema ready");
        Ok(())
    }
}

#[async_trait]
impl FileRepository for PgFileRepository {
    async fn create(&self, record: NewFileRecord) -> RepositoryResult<FileRecord> {
        let size_bytes = i64::try_from(record.size_bytes).map_err(|_| {
            RepositoryError::InvalidRecord(format!("size {} out of range", record.size_bytes))
        })?;

        let query = format!(
            "INSERT INTO {table} (id, project_id, folder_name, original_name, storage_path, \
             public_url, low_res_url, blur_hash, mime_type, size_bytes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {columns}",
            table = FILE_METADATA_TABLE,
            columns = SELECT_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(record.id.uuid())
            .bind(record.project_id.as_str())
            .bind(record.folder_name.as_str())
            .bind(&record.original_name)
            .bind(&record.storage_path)
            .bind(&record.public_url)
            .bind(&record.low_res_url)
            .bind(&record.blur_hash)
            .bind(&record.mime_type)
            .bind(size_bytes)
            .fetch_one(&self.pool)
            .await?;

        FileRow::from_pg_row(&row)?.into_record()
    }

    async fn find_by_project(
        &self,
        project: &ProjectId,
        folder: Option<&FolderName>,
    ) -> RepositoryResult<Vec<FileRecord>> {
        let rows = match folder {
            Some(folder) => {
                let query = format!(
                    "SELECT {columns} FROM {table} WHERE project_id = $1 AND folder_name = $2 \
                     ORDER BY created_at DESC",
                    table = FILE_METADATA_TABLE,
                    columns = SELECT_COLUMNS
                );
                sqlx::query(&query)
                    .bind(project.as_str())
                    .bind(folder.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let query = format!(
                    "SELECT {columns} FROM {table} WHERE project_id = $1 \
                     ORDER BY created_at DESC",
                    table = FILE_METADATA_TABLE,
                    columns = SELECT_COLUMNS
                );
                sqlx::query(&query)
                    .bind(project.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter()
            .map(|row| FileRow::from_pg_row(row)?.into_record())
            .collect()
    }

    async fn find_by_id(&self, id: FileId) -> RepositoryResult<FileRecord> {
        let query = format!(
            "SELECT {columns} FROM {table} WHERE id = $1",
            table = FILE_METADATA_TABLE,
            columns = SELECT_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(id.uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        FileRow::from_pg_row(&row)?.into_record()
    }
}

/// Column values of one `file_metadata` row.
#[derive(Debug)]
struct FileRow {
    id: Uuid,
    project_id: String,
    folder_name: String,
    original_name: String,
    storage_path: String,
    public_url: String,
    low_res_url: String,
    blur_hash: Vec<u8>,
    mime_type: String,
    size_bytes: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FileRow {
    fn from_pg_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            project_id: row.try_get("project_id")?,
            folder_name: row.try_get("folder_name")?,
            original_name: row.try_get("original_name")?,
            storage_path: row.try_get("storage_path")?,
            public_url: row.try_get("public_url")?,
            low_res_url: row.try_get("low_res_url")?,
            blur_hash: row.try_get("blur_hash")?,
            mime_type: row.try_get("mime_type")?,
            size_bytes: row.try_get("size_bytes")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_record(self) -> RepositoryResult<FileRecord> {
        let size_bytes = u64::try_from(self.size_bytes).map_err(|_| {
            RepositoryError::InvalidRecord(format!(
                "negative size {} for {}",
                self.size_bytes, self.id
            ))
        })?;

        Ok(FileRecord {
            id: FileId::from_uuid(self.id),
            project_id: self.project_id,
            folder_name: self.folder_name,
            original_name: self.original_name,
            storage_path: self.storage_path,
            public_url: self.public_url,
            low_res_url: self.low_res_url,
            blur_hash: self.blur_hash,
            mime_type: self.mime_type,
            size_bytes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
