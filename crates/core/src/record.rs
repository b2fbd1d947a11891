//! File metadata records.

use chrono::{DateTime, Utc};
use omstorage_types::{FolderName, ProjectId};
use omstorage_uuid::FileId;
use serde::Serialize;

/// A stored file as the metadata repository returns it.
///
/// `storage_path` is internal to the blob store and is skipped when serialised.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub id: FileId,
    pub project_id: String,
    pub folder_name: String,
    pub original_name: String,
    #[serde(skip_serializing)]
    pub storage_path: String,
    pub public_url: String,
    pub low_res_url: String,
    #[serde(serialize_with = "serialize_base64")]
    pub blur_hash: Vec<u8>,
    pub mime_type: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A record assembled by the upload pipeline, before the repository stamps it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewFileRecord {
    pub id: FileId,
    pub project_id: ProjectId,
    pub folder_name: FolderName,
    pub original_name: String,
    pub storage_path: String,
    pub public_url: String,
    pub low_res_url: String,
    pub blur_hash: Vec<u8>,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl NewFileRecord {
    /// Completes the record with repository-assigned timestamps.
    pub fn into_record(self, created_at: DateTime<Utc>) -> FileRecord {
        FileRecord {
            id: self.id,
            project_id: self.project_id.as_str().to_owned(),
            folder_name: self.folder_name.as_str().to_owned(),
            original_name: self.original_name,
            storage_path: self.storage_path,
            public_url: self.public_url,
            low_res_url: self.low_res_url,
            blur_hash: self.blur_hash,
            mime_type: self.mime_type,
            size_bytes: self.size_bytes,
            created_at,
            updated_at: created_at,
        }
    }
}

fn serialize_base64<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use base64::Engine as _;
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewFileRecord {
        let id = FileId::parse("52e6d62a-5a9f-43b5-9b37-d278a94663e2").unwrap();
        NewFileRecord {
            id,
            project_id: ProjectId::new("proj1").unwrap(),
            folder_name: FolderName::default(),
            original_name: "photo.jpg".into(),
            storage_path: "/srv/uploads/proj1/52e6d62a-5a9f-43b5-9b37-d278a94663e2.jpg".into(),
            public_url: "/storage/proj1/52e6d62a-5a9f-43b5-9b37-d278a94663e2.jpg".into(),
            low_res_url: String::new(),
            blur_hash: vec![1, 2, 3],
            mime_type: "image/jpeg".into(),
            size_bytes: 500_000,
        }
    }

    #[test]
    fn test_serialisation_hides_storage_path() {
        let record = sample().into_record(Utc::now());
        let json = serde_json::to_value(&record).unwrap();

        assert!(json.get("storage_path").is_none());
        assert_eq!(json["id"], "52e6d62a-5a9f-43b5-9b37-d278a94663e2");
        assert_eq!(json["folder_name"], "default");
        assert_eq!(json["blur_hash"], "AQID");
        assert_eq!(json["size_bytes"], 500_000);
    }

    #[test]
    fn test_into_record_sets_both_timestamps() {
        let now = Utc::now();
        let record = sample().into_record(now);
        assert_eq!(record.created_at, now);
        assert_eq!(record.updated_at, now);
        assert_eq!(record.project_id, "proj1");
    }
}
