//! Publish transcoded output to the destination bucket.
//!
//! Walks the job directory recursively, uploads every file under the job's
//! `videos/{stem}/` prefix, and returns the link map for the playlists it
//! published. Each walk level returns its links upward and the caller
//! merges, so concurrent jobs on one host never share link state.

use std::path::{Path, PathBuf};

use tracing::info;

use vodforge_media::MASTER_PLAYLIST;
use vodforge_models::{renditions, LinkMap};
use vodforge_storage::StorageClient;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// Upload the finished job directory and collect playlist links.
pub async fn publish_dir(
    storage: &StorageClient,
    config: &WorkerConfig,
    job_dir: &Path,
) -> WorkerResult<LinkMap> {
    let prefix = config.publish_prefix();
    let mut links = LinkMap::new();
    let mut uploaded = 0usize;

    // Iterative walk; HLS trees are two levels deep but segment counts vary.
    let mut pending: Vec<PathBuf> = vec![job_dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                pending.push(path);
                continue;
            }

            let relative = path
                .strip_prefix(job_dir)
                .map_err(|e| WorkerError::upload_failed(e.to_string()))?
                .to_string_lossy()
                .replace('\\', "/");
            let key = format!("{prefix}/{relative}");

            storage
                .upload_file(&path, &config.dest_bucket, &key, content_type(&relative))
                .await?;
            uploaded += 1;

            if let Some(name) = classify_playlist(&relative) {
                links.insert_rendition(name, config.public_url(&key));
            }
        }
    }

    info!(
        prefix = %prefix,
        files = uploaded,
        "Published transcoded output"
    );
    Ok(links)
}

/// Map a playlist path to its link name.
///
/// The master playlist maps to the auto entry; each rendition's media
/// playlist maps to its rendition name. Segments and anything else carry no
/// link.
fn classify_playlist(relative: &str) -> Option<String> {
    if relative == MASTER_PLAYLIST {
        return Some(vodforge_models::MASTER_PLAYLIST_KEY.to_string());
    }
    for format in renditions() {
        if relative == format!("{}/index.m3u8", format.name) {
            return Some(format.name.to_string());
        }
    }
    None
}

fn content_type(relative: &str) -> &'static str {
    match relative.rsplit('.').next() {
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("ts") => "video/mp2t",
        Some("vtt") => "text/vtt",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_playlist_maps_to_auto() {
        assert_eq!(classify_playlist("playlist.m3u8").as_deref(), Some("auto"));
    }

    #[test]
    fn rendition_playlists_map_to_their_name() {
        assert_eq!(classify_playlist("360P/index.m3u8").as_deref(), Some("360P"));
        assert_eq!(classify_playlist("1080P/index.m3u8").as_deref(), Some("1080P"));
    }

    #[test]
    fn segments_and_strays_carry_no_link() {
        assert_eq!(classify_playlist("360P/index0.ts"), None);
        assert_eq!(classify_playlist("540P/index.m3u8"), None);
        assert_eq!(classify_playlist("notes.txt"), None);
    }

    #[test]
    fn content_types_cover_hls_artifacts() {
        assert_eq!(content_type("playlist.m3u8"), "application/vnd.apple.mpegurl");
        assert_eq!(content_type("720P/index3.ts"), "video/mp2t");
        assert_eq!(content_type("subtitles.vtt"), "text/vtt");
        assert_eq!(content_type("unknown"), "application/octet-stream");
    }
}
