//! Conversion orchestration.
//!
//! The full request path: probe the result cache, take the storage lock,
//! download the source, run the frame pipeline, transcode for streaming,
//! publish, release the lock. Repeating a request for the same source is
//! harmless at every stage.

use std::sync::Arc;

use tracing::{info, warn};

use anivert_media::{transcode_faststart, FramePipeline, FrameScorer};
use anivert_models::{ConversionResult, SourceRef};
use anivert_storage::ObjectStore;

use crate::cache::ResultCache;
use crate::config::ConvertConfig;
use crate::error::ConvertResult;
use crate::lock::{ConversionLock, LockAcquisition};
use crate::publish::Publisher;

/// Outcome of a conversion request.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The converted video is available at the signed URL.
    Completed(ConversionResult),
    /// Another request is already converting this source.
    AlreadyProcessing,
}

/// End-to-end conversion service.
pub struct ConversionService {
    store: Arc<dyn ObjectStore>,
    cache: ResultCache,
    lock: ConversionLock,
    publisher: Publisher,
    pipeline: FramePipeline,
    work_dir: String,
}

impl ConversionService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        scorer: Arc<dyn FrameScorer>,
        config: &ConvertConfig,
    ) -> Self {
        Self {
            cache: ResultCache::new(store.clone()),
            lock: ConversionLock::new(store.clone(), config.lock_ttl),
            publisher: Publisher::new(store.clone(), config.url_expiry),
            pipeline: FramePipeline::new(scorer),
            work_dir: config.work_dir.clone(),
            store,
        }
    }

    /// Convert a source video, or return the existing result.
    ///
    /// Idempotent: a finished conversion is served straight from the
    /// output object, and concurrent requests for the same source are
    /// collapsed to a single conversion by the storage lock.
    pub async fn convert(&self, source: &SourceRef) -> ConvertResult<Outcome> {
        let output = source.output_ref();

        if self.cache.exists(&output).await? {
            info!(source = %source, "Serving existing conversion");
            let result = self.publisher.signed_url(&output).await?;
            return Ok(Outcome::Completed(result));
        }

        let lock_ref = output.lock_ref();
        if self.lock.try_acquire(&lock_ref).await? == LockAcquisition::AlreadyHeld {
            info!(source = %source, "Conversion already in progress");
            return Ok(Outcome::AlreadyProcessing);
        }

        let outcome = self.run_conversion(source).await;

        // The lock must come off on failure too, or the source would be
        // stuck unconvertible until the TTL reclaim.
        if let Err(e) = self.lock.release(&lock_ref).await {
            warn!(lock = %lock_ref, error = %e, "Failed to release conversion lock");
        }

        outcome.map(Outcome::Completed)
    }

    async fn run_conversion(&self, source: &SourceRef) -> ConvertResult<ConversionResult> {
        let output = source.output_ref();

        tokio::fs::create_dir_all(&self.work_dir).await?;
        let scratch = tempfile::tempdir_in(&self.work_dir)?;

        let source_path = scratch.path().join("source.mp4");
        let styled_path = scratch.path().join("styled.mp4");
        let final_path = scratch.path().join("final.mp4");

        info!(source = %source, "Downloading source video");
        self.store
            .download_file(&source.bucket, &source.key, &source_path)
            .await?;

        let meta = self.pipeline.convert(&source_path, &styled_path).await?;
        info!(
            source = %source,
            width = meta.width,
            height = meta.height,
            "Frame pipeline finished"
        );

        transcode_faststart(&styled_path, &final_path).await?;

        self.publisher.publish(&final_path, &output).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvertError;
    use anivert_media::MediaResult;
    use anivert_storage::MemoryStore;
    use ndarray::Array4;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scorer that counts invocations and passes frames through unchanged.
    struct CountingScorer {
        calls: AtomicUsize,
    }

    impl CountingScorer {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl FrameScorer for CountingScorer {
        fn score(&self, input: Array4<f32>) -> MediaResult<Array4<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(input)
        }
    }

    fn test_config(work_dir: &Path) -> ConvertConfig {
        ConvertConfig {
            work_dir: work_dir.display().to_string(),
            ..ConvertConfig::default()
        }
    }

    fn source() -> SourceRef {
        SourceRef::new("videos", "cat.mp4").unwrap()
    }

    #[tokio::test]
    async fn test_cache_hit_skips_conversion() {
        let store = Arc::new(MemoryStore::new());
        let scorer = Arc::new(CountingScorer::new());
        let work = tempfile::tempdir().unwrap();
        let service = ConversionService::new(store.clone(), scorer.clone(), &test_config(work.path()));

        let source = source();
        store.insert("videos", &source.output_ref().key, b"converted".to_vec());

        match service.convert(&source).await.unwrap() {
            Outcome::Completed(result) => {
                assert!(result.url.contains("anime_converted/cat.mp4"));
            }
            Outcome::AlreadyProcessing => panic!("expected completed outcome"),
        }
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_held_lock_reports_processing() {
        let store = Arc::new(MemoryStore::new());
        let scorer = Arc::new(CountingScorer::new());
        let work = tempfile::tempdir().unwrap();
        let service = ConversionService::new(store.clone(), scorer, &test_config(work.path()));

        let source = source();
        let lock_ref = source.output_ref().lock_ref();
        let marker = serde_json::json!({ "created_at": chrono::Utc::now() });
        store.insert(
            &lock_ref.bucket,
            &lock_ref.key,
            serde_json::to_vec(&marker).unwrap(),
        );

        assert!(matches!(
            service.convert(&source).await.unwrap(),
            Outcome::AlreadyProcessing
        ));
    }

    #[tokio::test]
    async fn test_lock_released_after_failure() {
        let store = Arc::new(MemoryStore::new());
        let scorer = Arc::new(CountingScorer::new());
        let work = tempfile::tempdir().unwrap();
        let service = ConversionService::new(store.clone(), scorer, &test_config(work.path()));

        // Source object is absent, so the download step fails.
        let source = source();
        let err = service.convert(&source).await.unwrap_err();
        assert!(err.is_source_missing());

        let lock_ref = source.output_ref().lock_ref();
        assert!(!store.exists(&lock_ref.bucket, &lock_ref.key).await.unwrap());
    }

    /// Scorer that always fails inference.
    struct FailingScorer;

    impl FrameScorer for FailingScorer {
        fn score(&self, _input: Array4<f32>) -> MediaResult<Array4<f32>> {
            Err(anivert_media::MediaError::inference("model exploded"))
        }
    }

    #[tokio::test]
    async fn test_lock_released_when_pipeline_fails() {
        let store = Arc::new(MemoryStore::new());
        let work = tempfile::tempdir().unwrap();
        let service = ConversionService::new(
            store.clone(),
            Arc::new(FailingScorer),
            &test_config(work.path()),
        );

        // The source downloads fine but is not decodable video, so the
        // conversion dies inside the media stage, past the lock.
        let source = source();
        store.insert("videos", &source.key, b"not an mp4".to_vec());

        let err = service.convert(&source).await.unwrap_err();
        assert!(matches!(err, ConvertError::Media(_)));

        let lock_ref = source.output_ref().lock_ref();
        assert!(!store.exists(&lock_ref.bucket, &lock_ref.key).await.unwrap());
        assert!(!store.exists("videos", &source.output_ref().key).await.unwrap());
    }

    #[tokio::test]
    async fn test_repeat_request_after_completion_is_served_from_cache() {
        let store = Arc::new(MemoryStore::new());
        let scorer = Arc::new(CountingScorer::new());
        let work = tempfile::tempdir().unwrap();
        let service = ConversionService::new(store.clone(), scorer.clone(), &test_config(work.path()));

        let source = source();
        store.insert("videos", &source.output_ref().key, b"converted".to_vec());

        for _ in 0..3 {
            assert!(matches!(
                service.convert(&source).await.unwrap(),
                Outcome::Completed(_)
            ));
        }
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
    }
}
