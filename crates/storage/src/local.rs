use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{validate_path, BlobStore, StorageError, StorageResult, StoredObject};

/// Blob store backed by a directory, served over HTTP under `public_base_url`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
    max_object_bytes: usize,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>, max_object_bytes: usize) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            max_object_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if it does not exist yet.
    pub async fn ensure_root(&self) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        let segments = validate_path(path)?;
        Ok(segments
            .into_iter()
            .fold(self.root.clone(), |acc, segment| acc.join(segment)))
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url, path)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> StorageResult<StoredObject> {
        if bytes.len() > self.max_object_bytes {
            return Err(StorageError::TooLarge {
                size: bytes.len(),
                limit: self.max_object_bytes,
            });
        }

        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;

        tracing::info!(path, size = bytes.len(), content_type, "object uploaded");
        Ok(StoredObject {
            path: path.to_string(),
            url: self.url_for(path),
            size: bytes.len(),
            content_type: content_type.to_string(),
        })
    }

    async fn download_url(&self, path: &str) -> StorageResult<String> {
        let target = self.resolve(path)?;
        if tokio::fs::try_exists(&target).await? {
            Ok(self.url_for(path))
        } else {
            Err(StorageError::NotFound(path.to_string()))
        }
    }

    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let target = self.resolve(path)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> StorageResult<bool> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> LocalBlobStore {
        LocalBlobStore::new(dir.path(), "http://localhost:8080/media/", 1024)
    }

    #[tokio::test]
    async fn test_upload_read_and_url() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = store(&dir);

        let stored = blobs
            .upload("books/b1/cover.png", b"\x89PNG", "image/png")
            .await
            .unwrap();
        assert_eq!(stored.url, "http://localhost:8080/media/books/b1/cover.png");
        assert_eq!(stored.size, 4);

        assert_eq!(blobs.read("books/b1/cover.png").await.unwrap(), b"\x89PNG");
        assert_eq!(
            blobs.download_url("books/b1/cover.png").await.unwrap(),
            stored.url
        );
        assert!(dir.path().join("books").join("b1").join("cover.png").exists());
    }

    #[tokio::test]
    async fn test_missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = store(&dir);
        assert!(matches!(
            blobs.download_url("nope.txt").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            blobs.read("nope.txt").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(!blobs.delete("nope.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_oversized_and_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = store(&dir);
        let big = vec![0u8; 2048];
        assert!(matches!(
            blobs.upload("big.bin", &big, "application/octet-stream").await,
            Err(StorageError::TooLarge { size: 2048, limit: 1024 })
        ));
        assert!(matches!(
            blobs.upload("../escape.txt", b"x", "text/plain").await,
            Err(StorageError::InvalidPath(_))
        ));
    }
}
