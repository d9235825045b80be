//! Redis clients for the VodForge shared state.
//!
//! This crate provides the only two cross-instance shared resources of the
//! scheduler, plus the metadata record store:
//! - the admission counter (atomic INCR/DECR on a named integer key)
//! - the durable FIFO job queue (LPUSH/RPOP/LLEN on a named list)
//! - upsert-by-key video record documents with a processing index

pub mod counter;
pub mod error;
pub mod queue;
pub mod records;

pub use counter::{AdmissionCounter, COUNTER_KEY};
pub use error::{QueueError, QueueResult};
pub use queue::{JobQueue, QueueConfig, QUEUE_KEY};
pub use records::RecordStore;

/// Open a shared Redis client from `REDIS_URL`.
pub fn redis_client_from_env() -> QueueResult<redis::Client> {
    let url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    Ok(redis::Client::open(url.as_str())?)
}
