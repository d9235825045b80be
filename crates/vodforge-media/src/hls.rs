//! HLS rendition conversion.

use std::path::{Path, PathBuf};

use tracing::info;

use vodforge_models::RenditionFormat;

use crate::command::FfmpegCommand;
use crate::error::MediaResult;

/// Convert the source into one HLS rendition.
///
/// Creates `{job_dir}/{name}/` owned exclusively by this rendition task and
/// emits 6-second MPEG-TS segments plus the per-rendition `index.m3u8`.
/// The codec profile is fixed: 8-bit SDR H.264 with AAC audio.
pub async fn convert_rendition(
    source: impl AsRef<Path>,
    job_dir: impl AsRef<Path>,
    format: &RenditionFormat,
) -> MediaResult<PathBuf> {
    let out_dir = job_dir.as_ref().join(format.name);
    tokio::fs::create_dir_all(&out_dir).await?;

    let manifest = out_dir.join("index.m3u8");
    let segment_pattern = out_dir.join("index%d.ts");

    FfmpegCommand::new(source, &manifest)
        .video_codec("libx264")
        .preset("veryfast")
        .crf(20)
        // forces 8-bit SDR output (universal)
        .output_args(["-pix_fmt", "yuv420p"])
        .audio_codec("aac")
        .audio_bitrate("128k")
        .video_filter(format!("scale={}", format.scale))
        .output_args(["-start_number", "0"])
        .output_args(["-hls_time", "6"])
        .output_args(["-hls_list_size", "0"])
        .output_args([
            "-hls_segment_filename".to_string(),
            segment_pattern.to_string_lossy().to_string(),
        ])
        .output_args(["-f", "hls"])
        .run()
        .await?;

    info!(rendition = format.name, "Rendition converted");
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vodforge_models::renditions;

    #[test]
    fn rendition_output_paths_are_per_rendition() {
        for format in renditions() {
            let out = Path::new("/work/demo").join(format.name).join("index.m3u8");
            assert!(out.to_string_lossy().contains(format.name));
        }
    }
}
