//! Internal implementation of the identity allocator.

use crate::{UuidError, UuidResult};
use std::{fmt, path::Path, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Longest extension kept on a storage name.
const MAX_EXTENSION_LEN: usize = 16;

/// Prefix of the low-resolution preview derived from an image upload.
const LOW_RES_PREFIX: &str = "low_";

/// Extension of the low-resolution preview. Previews are always JPEG.
const LOW_RES_EXTENSION: &str = "jpg";

/// A file identifier in canonical form (36 lowercase characters, hyphenated).
///
/// Once constructed, the contained UUID is valid and displays canonically, so it can be used
/// directly to derive storage names and public URLs.
///
/// # Construction
/// - [`FileId::new`] generates a new random identifier (UUID v4).
/// - [`FileId::parse`] validates an externally supplied identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FileId(Uuid);

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl FileId {
    /// Generates a new identifier.
    ///
    /// The identifier is 122 bits of randomness (RFC 4122 version 4), so collisions are not a
    /// practical concern.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier that must already be in canonical form.
    ///
    /// Other common UUID spellings (uppercase, braced, simple) are rejected so that one file has
    /// exactly one textual identifier.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not canonical.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_canonical(input) {
            return Err(UuidError::InvalidInput(format!(
                "file id must be a lowercase hyphenated UUID, got: '{}'",
                input
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(e.to_string()))
    }

    /// Wraps an existing UUID, for values read back from a store.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is in canonical form.
    ///
    /// Purely syntactic: 36 bytes, hyphens at positions 8, 13, 18 and 23, lowercase hex
    /// everywhere else.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 36
            && input.bytes().enumerate().all(|(i, b)| match i {
                8 | 13 | 18 | 23 => b == b'-',
                _ => matches!(b, b'0'..=b'9' | b'a'..=b'f'),
            })
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for FileId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for FileId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for FileId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FileId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// The blob store name of an upload: its identifier plus the original extension.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StorageName {
    id: FileId,
    extension: Option<String>,
}

impl StorageName {
    /// Builds the storage name for `id`, keeping the extension of `original_name` when it is
    /// safe (see [`sanitize_extension`]).
    pub fn new(id: FileId, original_name: &str) -> Self {
        Self {
            id,
            extension: sanitize_extension(original_name),
        }
    }

    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// The name without its extension, which is always the canonical identifier.
    pub fn stem(&self) -> String {
        self.id.to_string()
    }

    /// Name of the low-resolution preview derived from this upload: `low_<stem>.jpg`.
    pub fn low_res_name(&self) -> String {
        format!("{}{}.{}", LOW_RES_PREFIX, self.stem(), LOW_RES_EXTENSION)
    }
}

impl fmt::Display for StorageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.extension {
            Some(ext) => write!(f, "{}.{}", self.id, ext),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Returns the lowercased extension of `original_name` if it is a plain ASCII alphanumeric
/// token of at most 16 characters.
///
/// The original name is client-controlled, so anything unusual is dropped rather than escaped.
pub fn sanitize_extension(original_name: &str) -> Option<String> {
    // Clients on Windows send backslash-separated paths.
    let file_name = original_name.rsplit(['/', '\\']).next().unwrap_or(original_name);
    let ext = Path::new(file_name).extension()?.to_str()?;

    if ext.is_empty() || ext.len() > MAX_EXTENSION_LEN {
        return None;
    }
    if !ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Allocates identities for incoming files.
///
/// Stateless: every call draws a new random identifier, so allocators can be shared freely
/// between concurrent requests.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityAllocator;

impl IdentityAllocator {
    pub fn new() -> Self {
        Self
    }

    /// Allocates a fresh identifier and the storage name derived from it.
    pub fn allocate(&self, original_name: &str) -> (FileId, StorageName) {
        let id = FileId::new();
        let name = StorageName::new(id, original_name);
        (id, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_new_generates_canonical_id() {
        let id = FileId::new();
        assert!(FileId::is_canonical(&id.to_string()));
    }

    #[test]
    fn test_parse_valid_canonical_id() {
        let input = "52e6d62a-5a9f-43b5-9b37-d278a94663e2";
        let id = FileId::parse(input).unwrap();
        assert_eq!(id.to_string(), input);
    }

    #[test]
    fn test_parse_rejects_uppercase() {
        let result = FileId::parse("52E6D62A-5A9F-43B5-9B37-D278A94663E2");
        assert!(matches!(result, Err(UuidError::InvalidInput(_))));
    }

    #[test]
    fn test_parse_rejects_simple_form() {
        let result = FileId::parse("52e6d62a5a9f43b59b37d278a94663e2");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(FileId::parse("not-a-file-id").is_err());
        assert!(FileId::parse("").is_err());
        assert!(FileId::parse("52e6d62a-5a9f-43b5-9b37-d278a94663eg").is_err());
    }

    #[test]
    fn test_from_str_matches_parse() {
        let id: FileId = "52e6d62a-5a9f-43b5-9b37-d278a94663e2".parse().unwrap();
        assert_eq!(id.to_string(), "52e6d62a-5a9f-43b5-9b37-d278a94663e2");
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let id = FileId::parse("52e6d62a-5a9f-43b5-9b37-d278a94663e2").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"52e6d62a-5a9f-43b5-9b37-d278a94663e2\"");
        let back: FileId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_storage_name_keeps_extension() {
        let id = FileId::parse("52e6d62a-5a9f-43b5-9b37-d278a94663e2").unwrap();
        let name = StorageName::new(id, "Photo.JPG");
        assert_eq!(name.to_string(), "52e6d62a-5a9f-43b5-9b37-d278a94663e2.jpg");
        assert_eq!(name.extension(), Some("jpg"));
    }

    #[test]
    fn test_storage_name_without_extension() {
        let id = FileId::parse("52e6d62a-5a9f-43b5-9b37-d278a94663e2").unwrap();
        let name = StorageName::new(id, "README");
        assert_eq!(name.to_string(), "52e6d62a-5a9f-43b5-9b37-d278a94663e2");
    }

    #[test]
    fn test_low_res_name() {
        let id = FileId::parse("52e6d62a-5a9f-43b5-9b37-d278a94663e2").unwrap();
        let name = StorageName::new(id, "scan.png");
        assert_eq!(
            name.low_res_name(),
            "low_52e6d62a-5a9f-43b5-9b37-d278a94663e2.jpg"
        );
    }

    #[test]
    fn test_sanitize_extension() {
        assert_eq!(sanitize_extension("a.tar.gz"), Some("gz".into()));
        assert_eq!(sanitize_extension("../../etc/passwd"), None);
        assert_eq!(sanitize_extension("..\\..\\evil.exe"), Some("exe".into()));
        assert_eq!(sanitize_extension(".bashrc"), None);
        assert_eq!(sanitize_extension("weird.j p g"), None);
        assert_eq!(sanitize_extension("x.abcdefghijklmnopq"), None);
        assert_eq!(sanitize_extension("trailing."), None);
    }

    #[test]
    fn test_allocate_ids_are_unique() {
        let allocator = IdentityAllocator::new();
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let (id, name) = allocator.allocate("photo.jpg");
            assert_eq!(name.id(), id);
            assert!(seen.insert(name.to_string()));
        }
    }
}
