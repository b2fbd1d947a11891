//! The upload-and-derive pipeline.
//!
//! Each file goes through the same sequence:
//!
//! 1. validate the project, folder and payload
//! 2. allocate an identity
//! 3. prepare the project container
//! 4. write the original bytes
//! 5. classify by declared MIME type
//! 6. derive previews for images
//! 7. assemble the record
//! 8. persist the record
//! 9. return the outcome
//!
//! Only steps 1, 3 and 4 are fatal. Everything after the original bytes are stored degrades to an
//! [`UploadWarning`] on the outcome instead of failing the upload.

use crate::config::CoreConfig;
use crate::error::{UploadError, UploadResult, UploadWarning};
use crate::record::{FileRecord, NewFileRecord};
use crate::repositories::FileRepository;
use bytes::Bytes;
use omstorage_files::BlobStore;
use omstorage_preview::DerivativeKind;
use omstorage_types::{FolderName, ProjectId};
use omstorage_uuid::{FileId, IdentityAllocator, StorageName};
use std::sync::Arc;

/// One file as received from a client.
#[derive(Clone, Debug)]
pub struct IncomingFile {
    /// Client-supplied name, kept for display only.
    pub original_name: String,
    /// Declared content type; never sniffed.
    pub mime_type: String,
    pub bytes: Bytes,
}

#[derive(Clone, Debug)]
pub struct UploadRequest {
    pub project_id: String,
    pub folder: Option<String>,
    pub file: Option<IncomingFile>,
}

/// Result of one upload that got past the fatal steps.
#[derive(Clone, Debug)]
pub struct UploadOutcome {
    pub record: NewFileRecord,
    pub storage_name: StorageName,
    pub warnings: Vec<UploadWarning>,
}

impl UploadOutcome {
    pub fn id(&self) -> FileId {
        self.record.id
    }

    /// False when the record could not be written; the blob is stored regardless.
    pub fn metadata_persisted(&self) -> bool {
        !self
            .warnings
            .iter()
            .any(|w| matches!(w, UploadWarning::MetadataWriteFailed(_)))
    }
}

/// Outcome of a multi-file request. Files are reported in request order.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub uploaded: Vec<UploadOutcome>,
    pub failed: Vec<(String, UploadError)>,
}

#[derive(Debug, Default)]
struct Derivatives {
    blur_hash: Vec<u8>,
    low_res_url: String,
    warnings: Vec<UploadWarning>,
}

/// Runs uploads against injected storage and metadata adapters.
#[derive(Clone, Debug)]
pub struct UploadService {
    config: Arc<CoreConfig>,
    blobs: Arc<dyn BlobStore>,
    repository: Arc<dyn FileRepository>,
    allocator: IdentityAllocator,
}

impl UploadService {
    pub fn new(
        config: Arc<CoreConfig>,
        blobs: Arc<dyn BlobStore>,
        repository: Arc<dyn FileRepository>,
    ) -> Self {
        Self {
            config,
            blobs,
            repository,
            allocator: IdentityAllocator::new(),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Uploads a single file.
    ///
    /// # Errors
    ///
    /// - [`UploadError::InvalidRequest`] for a bad project id or folder, or a missing file
    /// - [`UploadError::StorageUnavailable`] when the container or the original cannot be written
    pub async fn upload(&self, request: UploadRequest) -> UploadResult<UploadOutcome> {
        let (project, folder) = validate_target(&request.project_id, request.folder.as_deref())?;
        let file = request
            .file
            .ok_or_else(|| UploadError::InvalidRequest("no file in request".into()))?;

        self.process(&project, &folder, file).await
    }

    /// Uploads every file in `files`, one after another.
    ///
    /// A fatal failure excludes that file only. When the project or folder is invalid every file
    /// fails validation and the batch comes back with nothing uploaded.
    pub async fn upload_many(
        &self,
        project_id: &str,
        folder: Option<&str>,
        files: Vec<IncomingFile>,
    ) -> BatchOutcome {
        let mut batch = BatchOutcome::default();

        let target = validate_target(project_id, folder);
        for file in files {
            let name = file.original_name.clone();
            let result = match &target {
                Ok((project, folder)) => self.process(project, folder, file).await,
                Err(e) => Err(UploadError::InvalidRequest(e.to_string())),
            };

            match result {
                Ok(outcome) => batch.uploaded.push(outcome),
                Err(e) => {
                    tracing::warn!(
                        project_id = %project_id,
                        original_name = %name,
                        "file excluded from batch: {}",
                        e
                    );
                    batch.failed.push((name, e));
                }
            }
        }

        batch
    }

    /// Looks up a record by its textual id. Non-canonical ids are simply not found.
    pub async fn find_file(&self, id: &str) -> UploadResult<FileRecord> {
        let id = FileId::parse(id).map_err(|_| UploadError::NotFound(id.to_owned()))?;
        Ok(self.repository.find_by_id(id).await?)
    }

    /// Lists a project's records, newest first. A blank folder means every folder.
    pub async fn list_files(
        &self,
        project_id: &str,
        folder: Option<&str>,
    ) -> UploadResult<Vec<FileRecord>> {
        let project = ProjectId::new(project_id)
            .map_err(|e| UploadError::InvalidRequest(format!("project id: {}", e)))?;
        let folder = match folder.map(str::trim).filter(|f| !f.is_empty()) {
            Some(name) => Some(
                FolderName::resolve(Some(name))
                    .map_err(|e| UploadError::InvalidRequest(format!("folder: {}", e)))?,
            ),
            None => None,
        };

        Ok(self
            .repository
            .find_by_project(&project, folder.as_ref())
            .await?)
    }

    async fn process(
        &self,
        project: &ProjectId,
        folder: &FolderName,
        file: IncomingFile,
    ) -> UploadResult<UploadOutcome> {
        let (id, storage_name) = self.allocator.allocate(&file.original_name);
        let object_name = storage_name.to_string();

        self.blobs
            .ensure_container(project)
            .await
            .map_err(UploadError::StorageUnavailable)?;

        let size_bytes = file.bytes.len() as u64;
        let storage_path = self
            .blobs
            .write_object(project, &object_name, file.bytes.clone())
            .await
            .map_err(UploadError::StorageUnavailable)?;

        tracing::info!(
            file_id = %id,
            project_id = %project,
            size = size_bytes,
            mime_type = %file.mime_type,
            "stored upload"
        );

        let derivatives = if omstorage_preview::is_image_mime(&file.mime_type) {
            self.derive(project, &storage_name, file.bytes).await
        } else {
            Derivatives::default()
        };
        let mut warnings = derivatives.warnings;

        let record = NewFileRecord {
            id,
            project_id: project.clone(),
            folder_name: folder.clone(),
            original_name: file.original_name,
            storage_path: storage_path.to_string_lossy().into_owned(),
            public_url: self.config.public_url(project, &object_name),
            low_res_url: derivatives.low_res_url,
            blur_hash: derivatives.blur_hash,
            mime_type: file.mime_type,
            size_bytes,
        };

        if let Err(e) = self.repository.create(record.clone()).await {
            tracing::error!(
                file_id = %id,
                project_id = %project,
                "failed to persist file metadata: {}",
                e
            );
            warnings.push(UploadWarning::MetadataWriteFailed(e.to_string()));
        }

        Ok(UploadOutcome {
            record,
            storage_name,
            warnings,
        })
    }

    /// Best-effort blur thumbnail and low-resolution preview.
    async fn derive(
        &self,
        project: &ProjectId,
        storage_name: &StorageName,
        bytes: Bytes,
    ) -> Derivatives {
        let mut out = Derivatives::default();
        let file_id = storage_name.id();

        let generated =
            match tokio::task::spawn_blocking(move || omstorage_preview::generate(&bytes)).await {
                Ok(Ok(set)) => set,
                Ok(Err(e)) => {
                    out.warn(file_id, DerivativeKind::Decode, e.to_string());
                    return out;
                }
                Err(e) => {
                    let reason = worker_failure_reason(&e);
                    tracing::error!(file_id = %file_id, "{}", reason);
                    out.warnings.push(UploadWarning::DerivativeGenerationFailed {
                        kind: DerivativeKind::Worker,
                        reason,
                    });
                    return out;
                }
            };

        match generated.blur_thumbnail {
            Ok(hash) => out.blur_hash = hash,
            Err(e) => out.warn(file_id, DerivativeKind::BlurThumbnail, e.to_string()),
        }

        match generated.low_res_jpeg {
            Ok(jpeg) => {
                let name = storage_name.low_res_name();
                match self
                    .blobs
                    .write_object(project, &name, Bytes::from(jpeg))
                    .await
                {
                    Ok(_) => out.low_res_url = self.config.public_url(project, &name),
                    Err(e) => out.warn(file_id, DerivativeKind::LowResPreview, e.to_string()),
                }
            }
            Err(e) => out.warn(file_id, DerivativeKind::LowResPreview, e.to_string()),
        }

        out
    }
}

impl Derivatives {
    fn warn(&mut self, file_id: FileId, kind: DerivativeKind, reason: String) {
        tracing::warn!(file_id = %file_id, %kind, "derivative generation failed: {}", reason);
        self.warnings
            .push(UploadWarning::DerivativeGenerationFailed { kind, reason });
    }
}

fn worker_failure_reason(err: &tokio::task::JoinError) -> String {
    if err.is_panic() {
        format!("preview worker panicked: {}", err)
    } else {
        format!("preview worker was cancelled: {}", err)
    }
}

fn validate_target(project_id: &str, folder: Option<&str>) -> UploadResult<(ProjectId, FolderName)> {
    let project = ProjectId::new(project_id)
        .map_err(|e| UploadError::InvalidRequest(format!("project id: {}", e)))?;
    let folder = FolderName::resolve(folder)
        .map_err(|e| UploadError::InvalidRequest(format!("folder: {}", e)))?;
    Ok((project, folder))
}
