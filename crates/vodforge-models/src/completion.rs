//! Worker completion callback payload.

use serde::{Deserialize, Serialize};

use crate::links::LinkMap;
use crate::progress::ProgressState;

/// Body of the worker -> API completion callback.
///
/// Field names are camelCase on the wire; `progress` is COMPLETED or FAILED.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    /// Object key the worker processed
    pub object_key: String,
    /// Terminal progress state
    pub progress: ProgressState,
    /// Rendition name (plus "auto"/"subtitles") -> public URL
    #[serde(default)]
    pub video_resolutions: LinkMap,
    /// Thumbnail URL, if produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Subtitle track URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle_url: Option<String>,
}

impl CompletionReport {
    /// Build a success report from the worker's accumulated links.
    pub fn completed(object_key: impl Into<String>, links: LinkMap, thumbnail_url: Option<String>) -> Self {
        let subtitle_url = links.subtitles().map(str::to_string);
        Self {
            object_key: object_key.into(),
            progress: ProgressState::Completed,
            video_resolutions: links,
            thumbnail_url,
            subtitle_url,
        }
    }

    /// Build a failure report; no links are published on failure.
    pub fn failed(object_key: impl Into<String>) -> Self {
        Self {
            object_key: object_key.into(),
            progress: ProgressState::Failed,
            video_resolutions: LinkMap::new(),
            thumbnail_url: None,
            subtitle_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_fields_are_camel_case() {
        let mut links = LinkMap::new();
        links.set_master("https://cdn.example/v/playlist.m3u8");
        links.set_subtitles("https://cdn.example/v/subtitles.vtt");

        let report = CompletionReport::completed("uploads/videos/v.mp4", links, None);
        let json = serde_json::to_string(&report).unwrap();

        assert!(json.contains("\"objectKey\""));
        assert!(json.contains("\"videoResolutions\""));
        assert!(json.contains("\"subtitleUrl\""));
        assert!(json.contains("\"COMPLETED\""));
        assert!(!json.contains("thumbnailUrl"));
    }

    #[test]
    fn failed_report_publishes_no_links() {
        let report = CompletionReport::failed("k");
        assert_eq!(report.progress, ProgressState::Failed);
        assert!(report.video_resolutions.is_empty());
        assert!(report.subtitle_url.is_none());
    }

    #[test]
    fn completed_report_lifts_subtitle_url() {
        let mut links = LinkMap::new();
        links.set_subtitles("https://cdn.example/v/subtitles.vtt");
        let report = CompletionReport::completed("k", links, Some("https://cdn.example/t.jpg".into()));
        assert_eq!(report.subtitle_url.as_deref(), Some("https://cdn.example/v/subtitles.vtt"));
        assert_eq!(report.thumbnail_url.as_deref(), Some("https://cdn.example/t.jpg"));
    }
}
