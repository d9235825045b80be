//! Metadata store seam.
//!
//! The scheduler only needs a narrow upsert-by-key surface, so it talks to
//! this trait rather than the Redis record store directly.

use async_trait::async_trait;

use vodforge_models::{CompletionReport, ProgressState, VideoRecord};
use vodforge_queue::{QueueResult, RecordStore};

/// Upsert-by-key video record persistence.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Fetch a record by its unique object key.
    async fn find(&self, object_key: &str) -> QueueResult<Option<VideoRecord>>;

    /// Create or replace a record.
    async fn upsert(&self, record: &VideoRecord) -> QueueResult<()>;

    /// Rewrite only the progress field of an existing record.
    async fn update_progress(
        &self,
        object_key: &str,
        progress: ProgressState,
    ) -> QueueResult<VideoRecord>;

    /// Persist a worker completion report into the record.
    async fn apply_completion(&self, report: &CompletionReport) -> QueueResult<VideoRecord>;

    /// Object keys currently marked PROCESSING (reconciler sweep input).
    async fn processing_keys(&self) -> QueueResult<Vec<String>>;
}

#[async_trait]
impl MetadataStore for RecordStore {
    async fn find(&self, object_key: &str) -> QueueResult<Option<VideoRecord>> {
        RecordStore::find(self, object_key).await
    }

    async fn upsert(&self, record: &VideoRecord) -> QueueResult<()> {
        RecordStore::upsert(self, record).await
    }

    async fn update_progress(
        &self,
        object_key: &str,
        progress: ProgressState,
    ) -> QueueResult<VideoRecord> {
        RecordStore::update_progress(self, object_key, progress).await
    }

    async fn apply_completion(&self, report: &CompletionReport) -> QueueResult<VideoRecord> {
        let mut record = RecordStore::find(self, &report.object_key)
            .await?
            .ok_or_else(|| vodforge_queue::QueueError::record_not_found(&report.object_key))?;

        record.renditions = report.video_resolutions.clone();
        record.thumbnail_url = report.thumbnail_url.clone();
        record.subtitle_url = report.subtitle_url.clone();
        record.set_progress(report.progress);

        RecordStore::upsert(self, &record).await?;
        Ok(record)
    }

    async fn processing_keys(&self) -> QueueResult<Vec<String>> {
        RecordStore::processing_keys(self).await
    }
}
