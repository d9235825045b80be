//! Shared admission counter.
//!
//! A single non-negative integer in Redis counting jobs currently in
//! PROCESSING across every API instance. All mutation goes through the
//! store's atomic INCR/DECR; the counter is never read-modify-written at
//! the API level.

use redis::AsyncCommands;
use tracing::{debug, warn};

use crate::error::QueueResult;

/// Default Redis key for the counter.
pub const COUNTER_KEY: &str = "vodforge:transcode:active";

/// Client for the process-wide in-flight job counter.
#[derive(Clone)]
pub struct AdmissionCounter {
    client: redis::Client,
    key: String,
}

impl AdmissionCounter {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            key: COUNTER_KEY.to_string(),
        }
    }

    /// Override the counter key (used by tests sharing one Redis).
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Atomically increment and return the new value.
    ///
    /// Callers reserve a capacity slot with the returned value: if it
    /// exceeds the ceiling they must roll back with `decrement`.
    pub async fn increment(&self) -> QueueResult<i64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: i64 = conn.incr(&self.key, 1).await?;
        debug!(counter = value, "Incremented admission counter");
        Ok(value)
    }

    /// Atomically decrement and return the new value.
    pub async fn decrement(&self) -> QueueResult<i64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: i64 = conn.decr(&self.key, 1).await?;
        debug!(counter = value, "Decremented admission counter");
        Ok(value)
    }

    /// Current value; an unset key reads as 0.
    pub async fn get(&self) -> QueueResult<i64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<i64> = conn.get(&self.key).await?;
        Ok(value.unwrap_or(0))
    }

    /// Reset to zero. Used only by the drain loop's self-healing clamp.
    pub async fn reset(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set::<_, _, ()>(&self.key, 0).await?;
        warn!(key = %self.key, "Admission counter reset to 0");
        Ok(())
    }
}
