//! In-memory object store.
//!
//! Backs the conversion core's tests and local development runs. The
//! `put_if_absent` operation holds the map lock across the probe and the
//! insert, giving the same atomicity the S3 conditional PUT provides.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};
use crate::store::{ObjectStore, PresignOptions, UploadOptions};

/// Object store keeping everything in a process-local map.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly, bypassing upload plumbing.
    pub fn insert(&self, bucket: &str, key: &str, body: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), body);
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        let objects = self.objects.lock().unwrap();
        Ok(objects.contains_key(&(bucket.to_string(), key.to_string())))
    }

    async fn get_bytes(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        let objects = self.objects.lock().unwrap();
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn download_file(&self, bucket: &str, key: &str, path: &Path) -> StorageResult<()> {
        let bytes = self.get_bytes(bucket, key).await?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn upload_file(
        &self,
        path: &Path,
        bucket: &str,
        key: &str,
        _options: &UploadOptions,
    ) -> StorageResult<()> {
        let bytes = tokio::fs::read(path).await?;
        self.insert(bucket, key, bytes);
        Ok(())
    }

    async fn put_if_absent(&self, bucket: &str, key: &str, body: Vec<u8>) -> StorageResult<bool> {
        let mut objects = self.objects.lock().unwrap();
        let entry = (bucket.to_string(), key.to_string());
        if objects.contains_key(&entry) {
            return Ok(false);
        }
        objects.insert(entry, body);
        Ok(true)
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let mut objects = self.objects.lock().unwrap();
        objects.remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        options: &PresignOptions,
    ) -> StorageResult<String> {
        Ok(format!(
            "https://{}.s3.amazonaws.com/{}?X-Amz-Expires={}",
            bucket,
            key,
            options.expires_in.as_secs()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_exists_and_get() {
        let store = MemoryStore::new();
        store.insert("b", "k", b"data".to_vec());

        assert!(store.exists("b", "k").await.unwrap());
        assert!(!store.exists("b", "other").await.unwrap());
        assert_eq!(store.get_bytes("b", "k").await.unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store.get_bytes("b", "missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_put_if_absent_semantics() {
        let store = MemoryStore::new();
        assert!(store.put_if_absent("b", "k", b"first".to_vec()).await.unwrap());
        assert!(!store.put_if_absent("b", "k", b"second".to_vec()).await.unwrap());
        // Losing writer must not clobber the existing object
        assert_eq!(store.get_bytes("b", "k").await.unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        store.insert("b", "k", vec![1]);
        store.delete("b", "k").await.unwrap();
        store.delete("b", "k").await.unwrap();
        assert!(!store.exists("b", "k").await.unwrap());
    }

    #[tokio::test]
    async fn test_presign_embeds_expiry() {
        let store = MemoryStore::new();
        store.insert("b", "k", vec![]);
        let url = store
            .presign_get("b", "k", &PresignOptions::inline_video(Duration::from_secs(900)))
            .await
            .unwrap();
        assert!(url.contains("X-Amz-Expires=900"));
    }
}
