//! Video metadata records persisted by the API tier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::links::LinkMap;
use crate::progress::ProgressState;

/// Metadata record for one uploaded video, keyed by its object key.
///
/// Written on every progress transition; the persisted `progress` field is
/// the only user-visible failure signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    /// Unique object key of the uploaded source
    pub object_key: String,
    /// Filename stem derived from the key
    pub filename: String,
    /// Uploading user
    pub user_id: String,
    /// Title supplied at upload time
    pub title: String,
    /// Description supplied at upload time
    #[serde(default)]
    pub description: String,
    /// Current progress state
    #[serde(default)]
    pub progress: ProgressState,
    /// Rendition name -> public URL, filled in on completion
    #[serde(default)]
    pub renditions: LinkMap,
    /// Thumbnail URL, if the thumbnail collaborator produced one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Subtitle track URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_url: Option<String>,
    /// Playback view counter (maintained by collaborators, carried here)
    #[serde(default)]
    pub view_count: u64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl VideoRecord {
    /// Create a fresh record for a newly ingested upload.
    pub fn new(
        object_key: impl Into<String>,
        filename: impl Into<String>,
        user_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            object_key: object_key.into(),
            filename: filename.into(),
            user_id: user_id.into(),
            title: title.into(),
            description: description.into(),
            progress: ProgressState::Pending,
            renditions: LinkMap::new(),
            thumbnail_url: None,
            subtitle_url: None,
            view_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rewrite the progress state and bump the update timestamp.
    pub fn set_progress(&mut self, progress: ProgressState) {
        self.progress = progress;
        self.updated_at = Utc::now();
    }

    /// Seconds this record has sat in its current state.
    pub fn age_in_state_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.updated_at).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_starts_pending() {
        let record = VideoRecord::new("uploads/videos/a.mp4", "a", "u1", "Title", "");
        assert_eq!(record.progress, ProgressState::Pending);
        assert!(record.renditions.is_empty());
        assert_eq!(record.view_count, 0);
    }

    #[test]
    fn set_progress_bumps_updated_at() {
        let mut record = VideoRecord::new("k", "k", "u", "t", "");
        let before = record.updated_at;
        record.set_progress(ProgressState::Processing);
        assert_eq!(record.progress, ProgressState::Processing);
        assert!(record.updated_at >= before);
    }
}
