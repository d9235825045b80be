//! Metadata record store.
//!
//! Upsert-by-key JSON documents for video records, plus an index set of
//! keys currently in PROCESSING so the reconciler can sweep for orphans
//! without scanning the whole keyspace.

use redis::AsyncCommands;
use tracing::debug;

use vodforge_models::{ProgressState, VideoRecord};

use crate::error::{QueueError, QueueResult};

const RECORD_PREFIX: &str = "vodforge:video:";
const PROCESSING_INDEX_KEY: &str = "vodforge:videos:processing";

/// Typed client over the record documents.
#[derive(Clone)]
pub struct RecordStore {
    client: redis::Client,
}

impl RecordStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    fn record_key(object_key: &str) -> String {
        format!("{RECORD_PREFIX}{object_key}")
    }

    /// Fetch a record by object key.
    pub async fn find(&self, object_key: &str) -> QueueResult<Option<VideoRecord>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(Self::record_key(object_key)).await?;
        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Write a record, maintaining the processing index.
    pub async fn upsert(&self, record: &VideoRecord) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(record)?;
        conn.set::<_, _, ()>(Self::record_key(&record.object_key), payload)
            .await?;

        if record.progress == ProgressState::Processing {
            conn.sadd::<_, _, ()>(PROCESSING_INDEX_KEY, &record.object_key)
                .await?;
        } else {
            conn.srem::<_, _, ()>(PROCESSING_INDEX_KEY, &record.object_key)
                .await?;
        }

        debug!(object_key = %record.object_key, progress = %record.progress, "Upserted video record");
        Ok(())
    }

    /// Rewrite only the progress of an existing record.
    pub async fn update_progress(
        &self,
        object_key: &str,
        progress: ProgressState,
    ) -> QueueResult<VideoRecord> {
        let mut record = self
            .find(object_key)
            .await?
            .ok_or_else(|| QueueError::record_not_found(object_key))?;
        record.set_progress(progress);
        self.upsert(&record).await?;
        Ok(record)
    }

    /// Object keys of records currently marked PROCESSING.
    pub async fn processing_keys(&self) -> QueueResult<Vec<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let keys: Vec<String> = conn.smembers(PROCESSING_INDEX_KEY).await?;
        Ok(keys)
    }
}
