//! Worker configuration.
//!
//! Everything arrives through the container environment injected by the
//! launcher; the worker has no other configuration source.

use std::time::Duration;

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Object key of the source to transcode
    pub object_key: String,
    /// Temp bucket holding the uploaded source
    pub source_bucket: String,
    /// Final bucket for published renditions
    pub dest_bucket: String,
    /// Completion callback URL
    pub webhook_url: String,
    /// Public CDN domain for published artifacts
    pub cdn_domain: String,
    /// AWS region
    pub region: String,
    /// Optional thumbnail collaborator endpoint
    pub thumbnail_endpoint: Option<String>,
    /// Work directory for temporary files
    pub work_dir: String,
    /// Initial transcription poll interval
    pub subtitle_poll_interval: Duration,
    /// Maximum transcription poll interval after backoff
    pub subtitle_poll_cap: Duration,
    /// Hard deadline for transcription to finish
    pub subtitle_deadline: Duration,
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        let require = |name: &str| {
            std::env::var(name).map_err(|_| WorkerError::config_error(format!("{name} not set")))
        };
        let duration_secs = |name: &str, default: u64| {
            Duration::from_secs(
                std::env::var(name)
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default),
            )
        };

        Ok(Self {
            object_key: require("OBJECT_KEY")?,
            source_bucket: require("SOURCE_BUCKET")?,
            dest_bucket: require("DEST_BUCKET")?,
            webhook_url: require("WEBHOOK_URL")?,
            cdn_domain: require("CDN_DOMAIN")?,
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            thumbnail_endpoint: std::env::var("THUMBNAIL_API_ENDPOINT").ok(),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .unwrap_or_else(|_| "/tmp/vodforge".to_string()),
            subtitle_poll_interval: duration_secs("SUBTITLE_POLL_INTERVAL_SECS", 10),
            subtitle_poll_cap: duration_secs("SUBTITLE_POLL_CAP_SECS", 60),
            subtitle_deadline: duration_secs("SUBTITLE_DEADLINE_SECS", 30 * 60),
        })
    }

    /// Key prefix under which all published artifacts for this job live.
    pub fn publish_prefix(&self) -> String {
        format!("videos/{}", vodforge_models::key_stem(&self.object_key))
    }

    /// Public CDN URL for a published key.
    pub fn public_url(&self, key: &str) -> String {
        format!("https://{}/{}", self.cdn_domain, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_prefix_uses_key_stem() {
        let config = WorkerConfig {
            object_key: "uploads/videos/demo.mp4".to_string(),
            source_bucket: "src".to_string(),
            dest_bucket: "dst".to_string(),
            webhook_url: "http://api/api/trigger/worker".to_string(),
            cdn_domain: "cdn.example.com".to_string(),
            region: "us-east-1".to_string(),
            thumbnail_endpoint: None,
            work_dir: "/tmp/vodforge".to_string(),
            subtitle_poll_interval: Duration::from_secs(10),
            subtitle_poll_cap: Duration::from_secs(60),
            subtitle_deadline: Duration::from_secs(1800),
        };
        assert_eq!(config.publish_prefix(), "videos/demo");
        assert_eq!(
            config.public_url("videos/demo/playlist.m3u8"),
            "https://cdn.example.com/videos/demo/playlist.m3u8"
        );
    }
}
