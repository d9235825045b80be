//! Durable FIFO queue of transcode jobs.
//!
//! Jobs wait here whenever the admission counter is at capacity. Backed by
//! a Redis list so the queue survives API restarts and is shared across
//! instances: LPUSH at the tail, RPOP at the head, LLEN for length.

use redis::AsyncCommands;
use tracing::{debug, info};

use vodforge_models::TranscodeJob;

use crate::error::{QueueError, QueueResult};

/// Default Redis key for the waiting-job list.
pub const QUEUE_KEY: &str = "vodforge:transcode:queue";

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// List key holding serialized job descriptors
    pub queue_key: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            queue_key: QUEUE_KEY.to_string(),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            queue_key: std::env::var("QUEUE_KEY").unwrap_or_else(|_| QUEUE_KEY.to_string()),
        }
    }
}

/// FIFO job queue client.
#[derive(Clone)]
pub struct JobQueue {
    client: redis::Client,
    key: String,
}

impl JobQueue {
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self {
            client,
            key: config.queue_key,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    /// Build from an existing client (shares the connection with the
    /// counter and record store).
    pub fn with_client(client: redis::Client, key: impl Into<String>) -> Self {
        Self {
            client,
            key: key.into(),
        }
    }

    /// Push a job onto the tail of the queue.
    pub async fn enqueue(&self, job: &TranscodeJob) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(job)?;
        conn.lpush::<_, _, ()>(&self.key, payload).await?;
        info!(object_key = %job.object_key, "Enqueued transcode job");
        Ok(())
    }

    /// Pop the job at the head of the queue, if any.
    pub async fn dequeue(&self) -> QueueResult<Option<TranscodeJob>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.rpop(&self.key, None).await?;
        match payload {
            Some(payload) => {
                let job: TranscodeJob = serde_json::from_str(&payload)
                    .map_err(|e| QueueError::DequeueFailed(format!("bad payload: {e}")))?;
                debug!(object_key = %job.object_key, "Dequeued transcode job");
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    /// Number of jobs waiting.
    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.llen(&self.key).await?;
        Ok(len)
    }

    pub async fn is_empty(&self) -> QueueResult<bool> {
        Ok(self.len().await? == 0)
    }
}
