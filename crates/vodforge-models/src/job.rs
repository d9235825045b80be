//! Transcode job descriptor.

use serde::{Deserialize, Serialize};

use crate::progress::ProgressState;

/// A single transcode job as it travels between the admission controller,
/// the shared queue, and the launcher.
///
/// Immutable once created except for `progress`, which is rewritten on every
/// transition. The serialized form is what goes onto the Redis queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeJob {
    /// Source filename stem (no directory, no extension)
    pub filename: String,
    /// Object key of the uploaded source in the temp bucket
    #[serde(rename = "key")]
    pub object_key: String,
    /// Current progress state
    pub progress: ProgressState,
}

impl TranscodeJob {
    /// Build a job from an uploaded object key, deriving the filename stem.
    pub fn from_key(object_key: impl Into<String>) -> Self {
        let object_key = object_key.into();
        Self {
            filename: key_stem(&object_key).to_string(),
            object_key,
            progress: ProgressState::Pending,
        }
    }

    /// Rewrite the progress state, consuming and returning the job.
    pub fn with_progress(mut self, progress: ProgressState) -> Self {
        self.progress = progress;
        self
    }
}

/// Extract the filename stem from an object key.
///
/// `uploads/videos/a.mp4` -> `a`. Keys without an extension or directory
/// component degrade gracefully to the full trailing segment.
pub fn key_stem(object_key: &str) -> &str {
    let name = object_key.rsplit('/').next().unwrap_or(object_key);
    name.split('.').next().unwrap_or(name)
}
