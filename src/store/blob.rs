use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::utils::error::AppError;

const RETRY_BACKOFF_MS: u64 = 200;

/// Object storage for uploaded images.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `key` and returns the public URL. Writing the same
    /// key twice must be harmless.
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String, AppError>;
}

/// An image as submitted by the browser: base64 payload plus MIME type.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageUpload {
    pub content_type: String,
    pub data: String,
}

impl ImageUpload {
    fn extension(&self) -> Option<&'static str> {
        match self.content_type.as_str() {
            "image/jpeg" => Some("jpg"),
            "image/png" => Some("png"),
            "image/webp" => Some("webp"),
            _ => None,
        }
    }

    /// Decodes and checks the payload, returning `(key, bytes)`. Keys are the
    /// SHA-256 of the content, so retrying an upload rewrites the same object.
    pub fn prepare(&self, max_bytes: usize) -> Result<(String, Vec<u8>), AppError> {
        let extension = self.extension().ok_or_else(|| {
            AppError::ValidationError(format!(
                "Unsupported image type '{}'",
                self.content_type
            ))
        })?;

        // Browsers hand out data URLs; accept them as well as bare base64.
        let payload = match self.data.split_once(";base64,") {
            Some((_, encoded)) => encoded,
            None => self.data.as_str(),
        };

        let bytes = B64
            .decode(payload.trim())
            .map_err(|_| AppError::ValidationError("Image is not valid base64".to_string()))?;

        if bytes.is_empty() {
            return Err(AppError::ValidationError("Image is empty".to_string()));
        }
        if bytes.len() > max_bytes {
            return Err(AppError::ValidationError(format!(
                "Image exceeds the {} byte limit",
                max_bytes
            )));
        }

        let key = format!("{}.{}", hex::encode(Sha256::digest(&bytes)), extension);
        Ok((key, bytes))
    }
}

/// Validates `image`, then uploads it with up to `attempts` tries.
pub async fn upload_image(
    blobs: &dyn BlobStore,
    image: &ImageUpload,
    max_bytes: usize,
    attempts: u32,
) -> Result<String, AppError> {
    let (key, bytes) = image.prepare(max_bytes)?;
    let attempts = attempts.max(1);

    let mut attempt = 1;
    loop {
        match blobs.put(&key, &bytes, &image.content_type).await {
            Ok(url) => {
                tracing::debug!(key = %key, attempt, "Image uploaded");
                return Ok(url);
            }
            Err(e) if attempt < attempts => {
                tracing::warn!(key = %key, attempt, error = %e, "Image upload failed, retrying");
                tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * u64::from(attempt)))
                    .await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Writes blobs into a directory served under `/uploads`.
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub async fn new(root: PathBuf, public_base_url: &str) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            AppError::StorageError(format!("Cannot create {}: {}", root.display(), e))
        })?;
        Ok(Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<String, AppError> {
        let path = self.root.join(key);
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            AppError::StorageError(format!("Cannot write {}: {}", path.display(), e))
        })?;
        Ok(format!("{}/uploads/{}", self.public_base_url, key))
    }
}

/// Keeps blobs in memory. `fail_next` makes the next N puts fail.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    failures: AtomicU32,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, times: u32) {
        self.failures.store(times, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<String, AppError> {
        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(AppError::StorageError("simulated outage".to_string()));
        }

        self.objects
            .write()
            .await
            .insert(key.to_string(), bytes.to_vec());
        Ok(format!("memory://uploads/{}", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg(data: &[u8]) -> ImageUpload {
        ImageUpload {
            content_type: "image/jpeg".into(),
            data: B64.encode(data),
        }
    }

    #[test]
    fn test_prepare_is_content_addressed() {
        let (a, _) = jpeg(b"face").prepare(1024).unwrap();
        let (b, _) = jpeg(b"face").prepare(1024).unwrap();
        let (c, _) = jpeg(b"other").prepare(1024).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.ends_with(".jpg"));
    }

    #[test]
    fn test_prepare_accepts_data_urls() {
        let upload = ImageUpload {
            content_type: "image/png".into(),
            data: format!("data:image/png;base64,{}", B64.encode(b"png bytes")),
        };
        let (key, bytes) = upload.prepare(1024).unwrap();
        assert_eq!(bytes, b"png bytes");
        assert!(key.ends_with(".png"));
    }

    #[test]
    fn test_prepare_rejects_bad_input() {
        let gif = ImageUpload {
            content_type: "image/gif".into(),
            data: B64.encode(b"gif"),
        };
        assert!(matches!(gif.prepare(1024), Err(AppError::ValidationError(_))));

        let empty = jpeg(b"");
        assert!(matches!(empty.prepare(1024), Err(AppError::ValidationError(_))));

        let large = jpeg(&[0u8; 64]);
        assert!(matches!(large.prepare(16), Err(AppError::ValidationError(_))));

        let garbage = ImageUpload {
            content_type: "image/jpeg".into(),
            data: "not base64!!".into(),
        };
        assert!(matches!(garbage.prepare(1024), Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_upload_retries_until_success() {
        let blobs = MemoryBlobStore::new();
        blobs.fail_next(2);
        let url = upload_image(&blobs, &jpeg(b"face"), 1024, 3).await.unwrap();
        assert!(url.starts_with("memory://uploads/"));
        assert_eq!(blobs.len().await, 1);
    }

    #[tokio::test]
    async fn test_upload_gives_up_after_attempts() {
        let blobs = MemoryBlobStore::new();
        blobs.fail_next(5);
        let result = upload_image(&blobs, &jpeg(b"face"), 1024, 2).await;
        assert!(matches!(result, Err(AppError::StorageError(_))));
        assert!(blobs.is_empty().await);
    }

    #[tokio::test]
    async fn test_local_store_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().join("uploads"), "http://localhost:3001/")
            .await
            .unwrap();
        let url = store.put("abc.jpg", b"bytes", "image/jpeg").await.unwrap();
        assert_eq!(url, "http://localhost:3001/uploads/abc.jpg");
        let written = std::fs::read(dir.path().join("uploads").join("abc.jpg")).unwrap();
        assert_eq!(written, b"bytes");
    }
}
