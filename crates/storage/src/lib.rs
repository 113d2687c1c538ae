//! Object storage for uploaded media (covers, author photos, digital book files).

pub mod local;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use local::LocalBlobStore;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object path '{0}'")]
    InvalidPath(String),

    #[error("object '{0}' not found")]
    NotFound(String),

    #[error("object of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Metadata of an uploaded object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub path: String,
    pub url: String,
    pub size: usize,
    pub content_type: String,
}

/// Contract of the hosted object store: upload bytes, hand out URLs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> StorageResult<StoredObject>;

    /// Public URL of an existing object.
    async fn download_url(&self, path: &str) -> StorageResult<String>;

    async fn read(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Returns whether an object was removed.
    async fn delete(&self, path: &str) -> StorageResult<bool>;
}

/// Validate a relative `/`-separated object path and return its segments.
pub fn validate_path(path: &str) -> StorageResult<Vec<&str>> {
    if path.is_empty() || path.starts_with('/') || path.contains('\\') {
        return Err(StorageError::InvalidPath(path.to_string()));
    }

    let segments: Vec<&str> = path.split('/').collect();
    let valid = segments
        .iter()
        .all(|segment| !segment.is_empty() && *segment != "." && *segment != "..");
    if valid {
        Ok(segments)
    } else {
        Err(StorageError::InvalidPath(path.to_string()))
    }
}

/// Build an object key like `books/{id}/cover.png` from parts and a file name.
///
/// The file name is reduced to ASCII alphanumerics, dots, dashes and underscores.
pub fn object_key(prefix: &[&str], file_name: &str) -> String {
    let cleaned: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.');
    let name = if cleaned.is_empty() { "file" } else { cleaned };

    let mut key = prefix.join("/");
    if !key.is_empty() {
        key.push('/');
    }
    key.push_str(name);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path_accepts_nested() {
        assert_eq!(
            validate_path("books/b1/cover.png").unwrap(),
            vec!["books", "b1", "cover.png"]
        );
    }

    #[test]
    fn test_validate_path_rejects_traversal() {
        for bad in ["", "/etc/passwd", "books/../secret", "books//x", "./a", "a\\b"] {
            assert!(validate_path(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_object_key_sanitizes_file_name() {
        assert_eq!(
            object_key(&["digital-books", "d1"], "El Quijote (ed).epub"),
            "digital-books/d1/El_Quijote__ed_.epub"
        );
        assert_eq!(object_key(&["x"], ".."), "x/file");
    }
}
