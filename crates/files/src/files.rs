//! Local filesystem blob store
//!
//! [`LocalBlobStore`] keeps every project's objects in one directory under a configured root.
//!
//! # Security Model
//!
//! - The root directory is canonicalised once at construction
//! - Project identifiers are validated path segments ([`ProjectId`])
//! - Object names are checked to be a single segment before any path is built
//! - Objects are opened with `create_new`, so an existing object is never truncated
//!
//! # Implementation Notes
//!
//! - Container creation uses `create_dir_all`, which succeeds when the directory already
//!   exists; concurrent uploads to the same project do not race-fail
//! - A failed write may leave a partial object behind; the store does not clean it up

use crate::{BlobStore, FilesError};
use async_trait::async_trait;
use bytes::Bytes;
use omstorage_types::ProjectId;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Blob store backed by a local directory tree.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    /// Canonicalised root directory containing all project containers
    root_directory: PathBuf,
}

impl LocalBlobStore {
    /// Creates a store rooted at `root_directory`.
    ///
    /// # Errors
    ///
    /// Returns `FilesError::InvalidRootDirectory` if the root does not exist, is not a
    /// directory, or cannot be canonicalised.
    pub fn new(root_directory: &Path) -> Result<Self, FilesError> {
        if !root_directory.exists() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Directory does not exist: {}",
                root_directory.display()
            )));
        }

        if !root_directory.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root_directory.display()
            )));
        }

        let root_directory = root_directory.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        Ok(Self { root_directory })
    }

    /// Returns the canonicalised root directory
    #[must_use]
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    fn container_path(&self, project: &ProjectId) -> PathBuf {
        self.root_directory.join(project.as_str())
    }

    fn object_path(&self, project: &ProjectId, name: &str) -> Result<PathBuf, FilesError> {
        validate_object_name(name)?;
        Ok(self.container_path(project).join(name))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn ensure_container(&self, project: &ProjectId) -> Result<(), FilesError> {
        let container = self.container_path(project);
        fs::create_dir_all(&container).await.map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create project directory {}: {}",
                    container.display(),
                    e
                ),
            ))
        })
    }

    async fn write_object(
        &self,
        project: &ProjectId,
        name: &str,
        bytes: Bytes,
    ) -> Result<PathBuf, FilesError> {
        let path = self.object_path(project, name)?;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::AlreadyExists {
                    return FilesError::ObjectAlreadyExists(name.to_owned());
                }
                FilesError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create object {}: {}", path.display(), e),
                ))
            })?;

        file.write_all(&bytes).await.map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write object to {}: {}", path.display(), e),
            ))
        })?;
        file.flush().await?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "stored object");
        Ok(path)
    }

    async fn open_object(&self, project: &ProjectId, name: &str) -> Result<Bytes, FilesError> {
        let path = self.object_path(project, name)?;

        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(FilesError::ObjectNotFound(format!("{}/{}", project, name)))
            }
            Err(e) => Err(FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read object from {}: {}", path.display(), e),
            ))),
        }
    }
}

/// Object names must be a single, non-hidden path segment.
fn validate_object_name(name: &str) -> Result<(), FilesError> {
    if name.is_empty()
        || name.starts_with('.')
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(FilesError::InvalidPath(format!(
            "object name must be a single path segment: '{}'",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;
    use tempfile::TempDir;

    fn project(name: &str) -> ProjectId {
        ProjectId::new(name).unwrap()
    }

    fn create_store() -> (TempDir, LocalBlobStore) {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("uploads");
        std_fs::create_dir_all(&root).unwrap();
        let store = LocalBlobStore::new(&root).unwrap();
        (temp, store)
    }

    #[test]
    fn test_new_root_not_exists() {
        let temp = TempDir::new().unwrap();
        let result = LocalBlobStore::new(&temp.path().join("missing"));
        assert!(matches!(result, Err(FilesError::InvalidRootDirectory(_))));
    }

    #[test]
    fn test_new_root_not_directory() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("file.txt");
        std_fs::write(&root, "not a directory").unwrap();

        let result = LocalBlobStore::new(&root);
        assert!(matches!(result, Err(FilesError::InvalidRootDirectory(_))));
    }

    #[test]
    fn test_root_is_canonical() {
        let (_temp, store) = create_store();
        assert!(store.root_directory().is_absolute());
        assert!(store.root_directory().ends_with("uploads"));
    }

    #[tokio::test]
    async fn test_ensure_container_is_idempotent() {
        let (_temp, store) = create_store();
        let proj = project("proj1");

        store.ensure_container(&proj).await.unwrap();
        store.ensure_container(&proj).await.unwrap();

        assert!(store.root_directory().join("proj1").is_dir());
    }

    #[tokio::test]
    async fn test_ensure_container_concurrent() {
        let (_temp, store) = create_store();
        let proj = project("shared");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                let proj = proj.clone();
                tokio::spawn(async move { store.ensure_container(&proj).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert!(store.root_directory().join("shared").is_dir());
    }

    #[tokio::test]
    async fn test_write_and_open_object() {
        let (_temp, store) = create_store();
        let proj = project("proj1");
        store.ensure_container(&proj).await.unwrap();

        let path = store
            .write_object(&proj, "abc.txt", Bytes::from_static(b"Hello, World!"))
            .await
            .unwrap();

        assert!(path.ends_with("proj1/abc.txt"));
        assert_eq!(std_fs::read(&path).unwrap(), b"Hello, World!");

        let read = store.open_object(&proj, "abc.txt").await.unwrap();
        assert_eq!(&read[..], b"Hello, World!");
    }

    #[tokio::test]
    async fn test_write_binary_object() {
        let (_temp, store) = create_store();
        let proj = project("proj1");
        store.ensure_container(&proj).await.unwrap();

        let data: Vec<u8> = (0..=255).collect();
        store
            .write_object(&proj, "binary.dat", Bytes::from(data.clone()))
            .await
            .unwrap();

        let read = store.open_object(&proj, "binary.dat").await.unwrap();
        assert_eq!(read.to_vec(), data);
    }

    #[tokio::test]
    async fn test_write_never_overwrites() {
        let (_temp, store) = create_store();
        let proj = project("proj1");
        store.ensure_container(&proj).await.unwrap();

        store
            .write_object(&proj, "same.txt", Bytes::from_static(b"first"))
            .await
            .unwrap();
        let second = store
            .write_object(&proj, "same.txt", Bytes::from_static(b"second"))
            .await;

        assert!(matches!(second, Err(FilesError::ObjectAlreadyExists(_))));
        let read = store.open_object(&proj, "same.txt").await.unwrap();
        assert_eq!(&read[..], b"first");
    }

    #[tokio::test]
    async fn test_write_without_container_fails() {
        let (_temp, store) = create_store();
        let proj = project("never-created");

        let result = store
            .write_object(&proj, "a.txt", Bytes::from_static(b"x"))
            .await;
        assert!(matches!(result, Err(FilesError::Io(_))));
    }

    #[tokio::test]
    async fn test_write_rejects_unsafe_names() {
        let (_temp, store) = create_store();
        let proj = project("proj1");
        store.ensure_container(&proj).await.unwrap();

        for name in ["", "../escape.txt", "a/b.txt", "a\\b.txt", ".hidden"] {
            let result = store
                .write_object(&proj, name, Bytes::from_static(b"x"))
                .await;
            assert!(
                matches!(result, Err(FilesError::InvalidPath(_))),
                "expected rejection for {:?}",
                name
            );
        }
    }

    #[tokio::test]
    async fn test_open_missing_object() {
        let (_temp, store) = create_store();
        let proj = project("proj1");
        store.ensure_container(&proj).await.unwrap();

        let result = store.open_object(&proj, "missing.bin").await;
        assert!(matches!(result, Err(FilesError::ObjectNotFound(_))));
    }

    #[tokio::test]
    async fn test_projects_are_isolated() {
        let (_temp, store) = create_store();
        let a = project("a");
        let b = project("b");
        store.ensure_container(&a).await.unwrap();
        store.ensure_container(&b).await.unwrap();

        store
            .write_object(&a, "same.txt", Bytes::from_static(b"from a"))
            .await
            .unwrap();
        store
            .write_object(&b, "same.txt", Bytes::from_static(b"from b"))
            .await
            .unwrap();

        assert_eq!(&store.open_object(&a, "same.txt").await.unwrap()[..], b"from a");
        assert_eq!(&store.open_object(&b, "same.txt").await.unwrap()[..], b"from b");
    }
}
