//! Result cache.
//!
//! The durable conversion result is the output object itself, so the
//! cache is a metadata-only existence probe against the derived output
//! key. A positive probe short-circuits the whole pipeline.

use std::sync::Arc;

use tracing::debug;

use anivert_models::OutputRef;
use anivert_storage::ObjectStore;

use crate::error::ConvertResult;

/// Checks whether a conversion result already exists.
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn ObjectStore>,
}

impl ResultCache {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Probe for an existing result.
    ///
    /// A probe failure is surfaced as an error, never treated as a miss:
    /// converting again on a flaky probe would waste work, but returning
    /// a URL for an object we could not verify would be worse.
    pub async fn exists(&self, output: &OutputRef) -> ConvertResult<bool> {
        let hit = self.store.exists(&output.bucket, &output.key).await?;
        debug!(output = %output, hit, "Result cache probe");
        Ok(hit)
    }
}
