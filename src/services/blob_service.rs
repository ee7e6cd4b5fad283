use std::collections::HashMap;
use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("blob store rejected '{key}' with status {status}")]
    Rejected { key: String, status: u16 },
    #[error("invalid blob key: {0}")]
    InvalidKey(String),
    #[error("invalid blob store url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Object storage for slide images. The coordination service never looks
/// inside the bytes.
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key`, overwriting. Returns the stored key.
    fn upload<'a>(&'a self, bucket: &'a str, key: &'a str, bytes: Vec<u8>) -> BoxFuture<'a, Result<String, BlobError>>;

    fn exists<'a>(&'a self, bucket: &'a str, key: &'a str) -> BoxFuture<'a, Result<bool, BlobError>>;

    /// Remove the object. Returns whether it existed.
    fn delete<'a>(&'a self, bucket: &'a str, key: &'a str) -> BoxFuture<'a, Result<bool, BlobError>>;

    /// Public URL of the object, if the store exposes one.
    fn public_url(&self, bucket: &str, key: &str) -> Option<String>;
}

/// Object key for an image on a slide: `session/story/slide/filename`.
pub fn image_key(session_id: &str, story_id: &str, slide: u32, filename: &str) -> Result<String, BlobError> {
    for part in [session_id, story_id, filename] {
        let part = part.trim();
        if part.is_empty() || part == "." || part == ".." || part.contains('/') || part.contains('\\') {
            return Err(BlobError::InvalidKey(part.to_string()));
        }
    }
    Ok(format!("{}/{}/{}/{}", session_id.trim(), story_id.trim(), slide, filename.trim()))
}

/// In-process store used when no storage backend is configured, and in tests.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    public_base: Option<String>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_public_base(public_base: impl Into<String>) -> Self {
        Self {
            objects: Mutex::default(),
            public_base: Some(public_base.into()),
        }
    }

    pub async fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().await.get(&(bucket.to_string(), key.to_string())).cloned()
    }
}

impl BlobStore for MemoryBlobStore {
    fn upload<'a>(&'a self, bucket: &'a str, key: &'a str, bytes: Vec<u8>) -> BoxFuture<'a, Result<String, BlobError>> {
        Box::pin(async move {
            debug!("Storing {} bytes at {}/{}", bytes.len(), bucket, key);
            self.objects.lock().await.insert((bucket.to_string(), key.to_string()), bytes);
            Ok(key.to_string())
        })
    }

    fn exists<'a>(&'a self, bucket: &'a str, key: &'a str) -> BoxFuture<'a, Result<bool, BlobError>> {
        Box::pin(async move {
            Ok(self.objects.lock().await.contains_key(&(bucket.to_string(), key.to_string())))
        })
    }

    fn delete<'a>(&'a self, bucket: &'a str, key: &'a str) -> BoxFuture<'a, Result<bool, BlobError>> {
        Box::pin(async move {
            let removed = self.objects.lock().await.remove(&(bucket.to_string(), key.to_string()));
            Ok(removed.is_some())
        })
    }

    fn public_url(&self, bucket: &str, key: &str) -> Option<String> {
        self.public_base
            .as_ref()
            .map(|base| format!("{}/{}/{}", base.trim_end_matches('/'), bucket, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_keys_are_path_safe() {
        assert_eq!(image_key("abc123", "wolf-story", 2, "hare.png").unwrap(), "abc123/wolf-story/2/hare.png");
        assert!(image_key("abc123", "wolf-story", 2, "../hare.png").is_err());
        assert!(image_key("", "wolf-story", 2, "hare.png").is_err());
        assert!(image_key("abc123", "..", 2, "hare.png").is_err());
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryBlobStore::with_public_base("https://cdn.example/");
        assert!(!store.exists("user_images", "a/b/1/c.png").await.unwrap());
        let key = store.upload("user_images", "a/b/1/c.png", vec![1, 2, 3]).await.unwrap();
        assert_eq!(key, "a/b/1/c.png");
        assert!(store.exists("user_images", "a/b/1/c.png").await.unwrap());
        assert!(!store.exists("other", "a/b/1/c.png").await.unwrap());
        assert_eq!(
            store.public_url("user_images", &key).as_deref(),
            Some("https://cdn.example/user_images/a/b/1/c.png")
        );
        assert_eq!(MemoryBlobStore::new().public_url("user_images", &key), None);

        assert!(store.delete("user_images", &key).await.unwrap());
        assert!(!store.exists("user_images", &key).await.unwrap());
        assert!(!store.delete("user_images", &key).await.unwrap());
    }
}
