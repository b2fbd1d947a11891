//! Request and response bodies of the REST API.

use base64::Engine as _;
use omstorage_core::{FileRecord, UploadOutcome};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

/// Optional `?folder=` filter or target.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FolderQuery {
    /// Logical folder inside the project. Uploads default to `default`; listings default to
    /// every folder.
    pub folder: Option<String>,
}

/// Multipart body of the single upload route.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct SingleUploadForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

/// Multipart body of the multiple upload route; repeat `files` once per file.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct MultipleUploadForm {
    #[schema(value_type = Vec<String>, format = Binary)]
    files: Vec<Vec<u8>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadSingleRes {
    pub message: String,
    pub id: String,
    pub original_filename: String,
    pub size_bytes: u64,
    pub public_url: String,
    /// Empty when no preview was produced.
    pub low_res_url: String,
    /// Length in bytes of the blur thumbnail; 0 when none was produced.
    pub blur_thumb_len: usize,
    pub folder_name: String,
    pub mime_type: String,
    /// Non-fatal problems, such as a failed preview or metadata write.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl From<UploadOutcome> for UploadSingleRes {
    fn from(outcome: UploadOutcome) -> Self {
        let warnings = outcome.warnings.iter().map(ToString::to_string).collect();
        let record = outcome.record;
        Self {
            message: "File uploaded successfully".into(),
            id: record.id.to_string(),
            original_filename: record.original_name,
            size_bytes: record.size_bytes,
            public_url: record.public_url,
            low_res_url: record.low_res_url,
            blur_thumb_len: record.blur_hash.len(),
            folder_name: record.folder_name.as_str().to_owned(),
            mime_type: record.mime_type,
            warnings,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadedFileRes {
    pub id: String,
    pub original_name: String,
    pub public_url: String,
    pub low_res_url: String,
}

impl From<UploadOutcome> for UploadedFileRes {
    fn from(outcome: UploadOutcome) -> Self {
        let record = outcome.record;
        Self {
            id: record.id.to_string(),
            original_name: record.original_name,
            public_url: record.public_url,
            low_res_url: record.low_res_url,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadMultipleRes {
    pub message: String,
    pub count: usize,
    pub files: Vec<UploadedFileRes>,
}

/// A stored file's metadata. The internal storage path is never part of this view.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileRecordRes {
    pub id: String,
    pub project_id: String,
    pub folder_name: String,
    pub original_name: String,
    pub public_url: String,
    pub low_res_url: String,
    /// ThumbHash payload, base64 encoded. Empty when none was produced.
    pub blur_hash: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<FileRecord> for FileRecordRes {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id.to_string(),
            project_id: record.project_id,
            folder_name: record.folder_name,
            original_name: record.original_name,
            public_url: record.public_url,
            low_res_url: record.low_res_url,
            blur_hash: base64::engine::general_purpose::STANDARD.encode(&record.blur_hash),
            mime_type: record.mime_type,
            size_bytes: record.size_bytes,
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
        }
    }
}
