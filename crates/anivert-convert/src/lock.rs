//! Storage-backed conversion lock.
//!
//! One conversion at a time per output key, coordinated across
//! independent process instances through the shared storage namespace.
//! Acquisition is an atomic create-if-absent; the marker carries its
//! creation timestamp so a lock orphaned by a crashed process can be
//! reclaimed once it exceeds the configured TTL.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use anivert_models::LockRef;
use anivert_storage::ObjectStore;

use crate::error::ConvertResult;

/// Outcome of a lock acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAcquisition {
    /// This caller now holds the lock and must release it.
    Acquired,
    /// Another conversion is in progress; the caller must not start one.
    AlreadyHeld,
}

/// Content of a lock marker object.
#[derive(Debug, Serialize, Deserialize)]
struct LockMarker {
    created_at: DateTime<Utc>,
}

impl LockMarker {
    fn now() -> Self {
        Self {
            created_at: Utc::now(),
        }
    }
}

/// Mutual exclusion over conversions of the same output.
#[derive(Clone)]
pub struct ConversionLock {
    store: Arc<dyn ObjectStore>,
    ttl: Duration,
}

impl ConversionLock {
    pub fn new(store: Arc<dyn ObjectStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Try to acquire the lock.
    ///
    /// Never blocks: when the marker already exists and is fresh the
    /// caller is told `AlreadyHeld` and should report the conversion as
    /// in progress. A marker older than the TTL, or one whose content
    /// cannot be read as a marker, is treated as orphaned and reclaimed.
    pub async fn try_acquire(&self, lock: &LockRef) -> ConvertResult<LockAcquisition> {
        if self.create_marker(lock).await? {
            debug!(lock = %lock, "Conversion lock acquired");
            return Ok(LockAcquisition::Acquired);
        }

        match self.store.get_bytes(&lock.bucket, &lock.key).await {
            Ok(body) => {
                if let Ok(marker) = serde_json::from_slice::<LockMarker>(&body) {
                    if !self.is_stale(&marker) {
                        debug!(lock = %lock, "Conversion lock already held");
                        return Ok(LockAcquisition::AlreadyHeld);
                    }
                    warn!(
                        lock = %lock,
                        created_at = %marker.created_at,
                        "Reclaiming stale conversion lock"
                    );
                } else {
                    warn!(lock = %lock, "Reclaiming unreadable conversion lock marker");
                }

                self.store.delete(&lock.bucket, &lock.key).await?;
                self.retry_create(lock).await
            }
            // Released between the failed create and the read; one more
            // create attempt settles it.
            Err(e) if e.is_not_found() => self.retry_create(lock).await,
            Err(e) => Err(e.into()),
        }
    }

    /// Release the lock, deleting the marker unconditionally.
    ///
    /// Must run on every exit path after a successful acquisition so a
    /// failed conversion does not block future attempts.
    pub async fn release(&self, lock: &LockRef) -> ConvertResult<()> {
        self.store.delete(&lock.bucket, &lock.key).await?;
        debug!(lock = %lock, "Conversion lock released");
        Ok(())
    }

    async fn create_marker(&self, lock: &LockRef) -> ConvertResult<bool> {
        let body = serde_json::to_vec(&LockMarker::now())?;
        Ok(self.store.put_if_absent(&lock.bucket, &lock.key, body).await?)
    }

    async fn retry_create(&self, lock: &LockRef) -> ConvertResult<LockAcquisition> {
        if self.create_marker(lock).await? {
            debug!(lock = %lock, "Conversion lock acquired after reclaim");
            Ok(LockAcquisition::Acquired)
        } else {
            Ok(LockAcquisition::AlreadyHeld)
        }
    }

    fn is_stale(&self, marker: &LockMarker) -> bool {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        Utc::now().signed_duration_since(marker.created_at) > ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anivert_models::SourceRef;
    use anivert_storage::MemoryStore;

    fn lock_ref() -> LockRef {
        SourceRef::new("b", "v.mp4").unwrap().output_ref().lock_ref()
    }

    fn make_lock(store: Arc<MemoryStore>, ttl_secs: u64) -> ConversionLock {
        ConversionLock::new(store, Duration::from_secs(ttl_secs))
    }

    #[tokio::test]
    async fn test_acquire_release_cycle() {
        let store = Arc::new(MemoryStore::new());
        let lock = make_lock(store.clone(), 3600);
        let r = lock_ref();

        assert_eq!(lock.try_acquire(&r).await.unwrap(), LockAcquisition::Acquired);
        assert_eq!(
            lock.try_acquire(&r).await.unwrap(),
            LockAcquisition::AlreadyHeld
        );

        lock.release(&r).await.unwrap();
        assert_eq!(lock.try_acquire(&r).await.unwrap(), LockAcquisition::Acquired);
    }

    #[tokio::test]
    async fn test_concurrent_acquire_admits_exactly_one() {
        let store = Arc::new(MemoryStore::new());
        let lock = make_lock(store, 3600);
        let r = lock_ref();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let lock = lock.clone();
            let r = r.clone();
            handles.push(tokio::spawn(async move { lock.try_acquire(&r).await }));
        }

        let mut acquired = 0;
        for h in handles {
            if h.await.unwrap().unwrap() == LockAcquisition::Acquired {
                acquired += 1;
            }
        }
        assert_eq!(acquired, 1);
    }

    #[tokio::test]
    async fn test_stale_lock_is_reclaimed() {
        let store = Arc::new(MemoryStore::new());
        let lock = make_lock(store.clone(), 60);
        let r = lock_ref();

        let old = LockMarker {
            created_at: Utc::now() - chrono::Duration::hours(2),
        };
        store.insert(&r.bucket, &r.key, serde_json::to_vec(&old).unwrap());

        assert_eq!(lock.try_acquire(&r).await.unwrap(), LockAcquisition::Acquired);
    }

    #[tokio::test]
    async fn test_fresh_lock_is_respected() {
        let store = Arc::new(MemoryStore::new());
        let lock = make_lock(store.clone(), 3600);
        let r = lock_ref();

        let fresh = LockMarker {
            created_at: Utc::now() - chrono::Duration::minutes(1),
        };
        store.insert(&r.bucket, &r.key, serde_json::to_vec(&fresh).unwrap());

        assert_eq!(
            lock.try_acquire(&r).await.unwrap(),
            LockAcquisition::AlreadyHeld
        );
    }

    #[tokio::test]
    async fn test_unreadable_marker_is_reclaimed() {
        let store = Arc::new(MemoryStore::new());
        let lock = make_lock(store.clone(), 3600);
        let r = lock_ref();

        store.insert(&r.bucket, &r.key, b"not json".to_vec());

        assert_eq!(lock.try_acquire(&r).await.unwrap(), LockAcquisition::Acquired);
    }
}
