//! Queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Dequeue failed: {0}")]
    DequeueFailed(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueueError {
    pub fn record_not_found(key: impl Into<String>) -> Self {
        Self::RecordNotFound(key.into())
    }
}
