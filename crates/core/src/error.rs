use omstorage_files::FilesError;
use omstorage_preview::DerivativeKind;

/// Fatal outcome of an upload, or of a lookup through the upload service.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] FilesError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("metadata repository error: {0}")]
    Repository(#[source] RepositoryError),
}

pub type UploadResult<T> = std::result::Result<T, UploadError>;

/// Non-fatal problems encountered while processing an upload that otherwise succeeded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadWarning {
    #[error("{kind} generation failed: {reason}")]
    DerivativeGenerationFailed { kind: DerivativeKind, reason: String },
    #[error("metadata write failed: {0}")]
    MetadataWriteFailed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("file record not found: {0}")]
    NotFound(String),
    #[error("invalid file record: {0}")]
    InvalidRecord(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

impl From<RepositoryError> for UploadError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => UploadError::NotFound(id),
            other => UploadError::Repository(other),
        }
    }
}
