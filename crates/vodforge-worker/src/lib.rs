//! HLS transcoding worker.
//!
//! One worker instance transcodes exactly one uploaded source into the
//! fixed HLS rendition ladder, generates subtitles and a thumbnail, publishes
//! everything to the destination bucket, and reports back to the API.

pub mod callback;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod subtitles;
pub mod thumbnail;
pub mod upload;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use pipeline::Pipeline;
