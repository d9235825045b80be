//! Shared data models for the VodForge backend.
//!
//! This crate provides Serde-serializable types for:
//! - Transcode job descriptors and progress states
//! - The fixed rendition format table and bandwidth estimation
//! - Per-job link maps accumulated during publishing
//! - Video metadata records and worker completion reports

pub mod completion;
pub mod job;
pub mod links;
pub mod progress;
pub mod record;
pub mod rendition;

pub use completion::CompletionReport;
pub use job::{key_stem, TranscodeJob};
pub use links::{LinkMap, MASTER_PLAYLIST_KEY, SUBTITLES_KEY};
pub use progress::ProgressState;
pub use record::VideoRecord;
pub use rendition::{rendition_bandwidth, renditions, RenditionFormat, BANDWIDTH_FACTOR};
