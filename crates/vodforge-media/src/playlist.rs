//! Master playlist assembly.

use std::path::{Path, PathBuf};

use tracing::info;

use vodforge_models::{rendition_bandwidth, renditions};

use crate::error::MediaResult;

/// Filename of the master playlist inside the job work directory.
pub const MASTER_PLAYLIST: &str = "playlist.m3u8";

/// Render the master playlist text for the fixed rendition table.
///
/// Each variant advertises the deterministic bandwidth estimate, its
/// resolution, and the `subs` subtitle group, and points at the rendition's
/// own `index.m3u8`.
pub fn master_playlist_content() -> String {
    let mut content = String::from("#EXTM3U\n#EXT-X-VERSION:3\n");
    for format in renditions() {
        content.push_str(&format!(
            "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={},SUBTITLES=\"subs\"\n",
            rendition_bandwidth(format),
            format.resolution(),
        ));
        content.push_str(&format!("{}/index.m3u8\n\n", format.name));
    }
    content
}

/// Write the master playlist into the job work directory.
pub async fn write_master_playlist(job_dir: impl AsRef<Path>) -> MediaResult<PathBuf> {
    let path = job_dir.as_ref().join(MASTER_PLAYLIST);
    tokio::fs::write(&path, master_playlist_content()).await?;
    info!("Master playlist written to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playlist_lists_all_renditions_in_order() {
        let content = master_playlist_content();
        assert!(content.starts_with("#EXTM3U\n#EXT-X-VERSION:3\n"));

        let p360 = content.find("360P/index.m3u8").unwrap();
        let p480 = content.find("480P/index.m3u8").unwrap();
        let p720 = content.find("720P/index.m3u8").unwrap();
        let p1080 = content.find("1080P/index.m3u8").unwrap();
        assert!(p360 < p480 && p480 < p720 && p720 < p1080);
    }

    #[test]
    fn bandwidth_lines_use_fixed_formula() {
        let content = master_playlist_content();
        assert!(content.contains("BANDWIDTH=288000,RESOLUTION=640x360"));
        assert!(content.contains("BANDWIDTH=576000,RESOLUTION=1280x720"));
        assert!(content.contains("BANDWIDTH=864000,RESOLUTION=1920x1080"));
        assert!(content.contains("SUBTITLES=\"subs\""));
    }

    #[tokio::test]
    async fn writes_playlist_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_master_playlist(dir.path()).await.unwrap();
        assert_eq!(path.file_name().unwrap(), MASTER_PLAYLIST);
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, master_playlist_content());
    }
}
