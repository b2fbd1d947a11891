//! Validated text types shared across the omstorage crates.
//!
//! Values of these types are checked once, at the edge where they enter the system, so the
//! pipeline and the stores can rely on them without re-validating.

/// Maximum length of a project identifier.
pub const MAX_PROJECT_ID_LEN: usize = 128;

/// Maximum length of a logical folder name.
pub const MAX_FOLDER_NAME_LEN: usize = 255;

/// Folder used when an upload does not name one.
pub const DEFAULT_FOLDER_NAME: &str = "default";

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// The input text exceeded the allowed length
    #[error("Text exceeds maximum length of {0} characters")]
    TooLong(usize),

    /// The input text contained characters that are not allowed
    #[error("Text contains invalid characters: {0}")]
    InvalidCharacters(String),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// The top-level grouping key for stored files.
///
/// A project identifier doubles as a directory name in the blob store, so beyond being
/// non-empty it must be a single safe path segment: ASCII alphanumerics, `-`, `_` and `.`,
/// at most [`MAX_PROJECT_ID_LEN`] characters, and never `.` or `..`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectId(NonEmptyText);

impl ProjectId {
    /// Validates `input` as a project identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Empty`] for blank input, [`TextError::TooLong`] past the length
    /// bound, and [`TextError::InvalidCharacters`] for anything that is not a safe path segment.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let text = NonEmptyText::new(input)?;
        let value = text.as_str();

        if value.len() > MAX_PROJECT_ID_LEN {
            return Err(TextError::TooLong(MAX_PROJECT_ID_LEN));
        }

        if value == "." || value == ".." {
            return Err(TextError::InvalidCharacters(value.to_owned()));
        }

        let ok = value
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_'));
        if !ok {
            return Err(TextError::InvalidCharacters(value.to_owned()));
        }

        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ProjectId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl serde::Serialize for ProjectId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// A logical folder inside a project.
///
/// Folders are labels on records only; they never appear in storage paths. A missing or blank
/// folder becomes [`DEFAULT_FOLDER_NAME`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FolderName(NonEmptyText);

impl FolderName {
    /// Resolves an optional client-supplied folder name.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::TooLong`] if the trimmed name exceeds [`MAX_FOLDER_NAME_LEN`].
    pub fn resolve(input: Option<&str>) -> Result<Self, TextError> {
        match input.map(NonEmptyText::new) {
            Some(Ok(text)) => {
                if text.as_str().chars().count() > MAX_FOLDER_NAME_LEN {
                    return Err(TextError::TooLong(MAX_FOLDER_NAME_LEN));
                }
                Ok(Self(text))
            }
            Some(Err(_)) | None => Ok(Self::default()),
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for FolderName {
    fn default() -> Self {
        Self(NonEmptyText(DEFAULT_FOLDER_NAME.to_owned()))
    }
}

impl std::fmt::Display for FolderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for FolderName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl serde::Serialize for FolderName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_text_trims() {
        let text = NonEmptyText::new("  photo.jpg \n").unwrap();
        assert_eq!(text.as_str(), "photo.jpg");
    }

    #[test]
    fn test_non_empty_text_rejects_whitespace() {
        assert_eq!(NonEmptyText::new("   "), Err(TextError::Empty));
    }

    #[test]
    fn test_non_empty_text_deserialize_rejects_empty() {
        let result: Result<NonEmptyText, _> = serde_json::from_str("\"  \"");
        assert!(result.is_err());
    }

    #[test]
    fn test_project_id_accepts_safe_segment() {
        let id = ProjectId::new("proj-1_v2.0").unwrap();
        assert_eq!(id.as_str(), "proj-1_v2.0");
    }

    #[test]
    fn test_project_id_rejects_empty() {
        assert_eq!(ProjectId::new(""), Err(TextError::Empty));
    }

    #[test]
    fn test_project_id_rejects_traversal() {
        assert!(matches!(
            ProjectId::new(".."),
            Err(TextError::InvalidCharacters(_))
        ));
        assert!(matches!(
            ProjectId::new("../etc"),
            Err(TextError::InvalidCharacters(_))
        ));
        assert!(matches!(
            ProjectId::new("a/b"),
            Err(TextError::InvalidCharacters(_))
        ));
    }

    #[test]
    fn test_project_id_rejects_too_long() {
        let long = "a".repeat(MAX_PROJECT_ID_LEN + 1);
        assert_eq!(
            ProjectId::new(long),
            Err(TextError::TooLong(MAX_PROJECT_ID_LEN))
        );
    }

    #[test]
    fn test_folder_name_defaults() {
        assert_eq!(FolderName::resolve(None).unwrap().as_str(), "default");
        assert_eq!(FolderName::resolve(Some("  ")).unwrap().as_str(), "default");
    }

    #[test]
    fn test_folder_name_keeps_value() {
        let folder = FolderName::resolve(Some(" gallery/2024 ")).unwrap();
        assert_eq!(folder.as_str(), "gallery/2024");
    }

    #[test]
    fn test_folder_name_rejects_too_long() {
        let long = "f".repeat(MAX_FOLDER_NAME_LEN + 1);
        assert!(FolderName::resolve(Some(&long)).is_err());
    }

    #[test]
    fn test_serialize_as_plain_strings() {
        let project = ProjectId::new("proj1").unwrap();
        let folder = FolderName::default();
        assert_eq!(serde_json::to_string(&project).unwrap(), "\"proj1\"");
        assert_eq!(serde_json::to_string(&folder).unwrap(), "\"default\"");
    }
}
