//! The transcode pipeline for one job.
//!
//! Stage order:
//! 1. Download the source from the temp bucket
//! 2. Concurrently: transcode all renditions, generate subtitles, request a
//!    thumbnail
//! 3. Write the master playlist
//! 4. Publish the job directory and collect links
//! 5. Concurrently: delete the source object and deliver the completion
//!    report
//!
//! Renditions are all-or-nothing: the first failed rendition aborts the
//! rest and fails the job. The thumbnail is best-effort; subtitles are not.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{error, info, warn};

use vodforge_media::write_master_playlist;
use vodforge_models::{key_stem, renditions, CompletionReport, LinkMap};
use vodforge_storage::StorageClient;

use crate::callback::post_report;
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::subtitles::SubtitleGenerator;
use crate::thumbnail::request_thumbnail;
use crate::upload::publish_dir;

/// One-shot transcode pipeline.
pub struct Pipeline {
    config: WorkerConfig,
    storage: StorageClient,
    http: reqwest::Client,
}

impl Pipeline {
    pub fn new(config: WorkerConfig) -> WorkerResult<Self> {
        let storage = StorageClient::from_env()?;
        let http = reqwest::Client::new();
        Ok(Self {
            config,
            storage,
            http,
        })
    }

    /// Run the pipeline end to end, delivering the success report.
    pub async fn run(&self) -> WorkerResult<()> {
        let started = Instant::now();
        let job_dir = self.prepare_job_dir().await?;
        let source = self.download_source(&job_dir).await?;

        let subtitles = SubtitleGenerator::new(self.config.clone(), self.storage.clone())?;

        let (transcode, subtitle_url, thumbnail_url) = tokio::join!(
            self.transcode_renditions(&source, &job_dir),
            subtitles.generate(),
            request_thumbnail(&self.http, &self.config),
        );
        transcode?;
        let subtitle_url = subtitle_url?;

        // The raw source must not ride along with the published renditions.
        tokio::fs::remove_file(&source).await?;

        write_master_playlist(&job_dir).await?;

        let mut links = publish_dir(&self.storage, &self.config, &job_dir).await?;
        links.set_subtitles(subtitle_url);
        self.verify_links(&links)?;

        let report = CompletionReport::completed(&self.config.object_key, links, thumbnail_url);

        let (cleanup, delivery) = tokio::join!(
            self.cleanup(&job_dir),
            post_report(&self.http, &self.config.webhook_url, &report),
        );
        if let Err(e) = cleanup {
            warn!("Cleanup failed: {}", e);
        }
        delivery?;

        info!(
            object_key = %self.config.object_key,
            elapsed_secs = started.elapsed().as_secs(),
            "Transcode pipeline finished"
        );
        Ok(())
    }

    /// Deliver a failure report so the API frees the admission slot.
    pub async fn report_failure(&self) {
        let report = CompletionReport::failed(&self.config.object_key);
        if let Err(e) = post_report(&self.http, &self.config.webhook_url, &report).await {
            error!("Failed to deliver failure report: {}", e);
        }
    }

    /// Best-effort removal of the job work directory, for aborted runs.
    pub async fn discard_workdir(&self) {
        let job_dir = self.job_dir();
        match tokio::fs::remove_dir_all(&job_dir).await {
            Ok(()) => info!(dir = %job_dir.display(), "Work directory removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(dir = %job_dir.display(), "Failed to remove work directory: {}", e),
        }
    }

    fn job_dir(&self) -> PathBuf {
        Path::new(&self.config.work_dir).join(key_stem(&self.config.object_key))
    }

    async fn prepare_job_dir(&self) -> WorkerResult<PathBuf> {
        let job_dir = self.job_dir();
        tokio::fs::create_dir_all(&job_dir).await?;
        Ok(job_dir)
    }

    async fn download_source(&self, job_dir: &Path) -> WorkerResult<PathBuf> {
        let filename = self
            .config
            .object_key
            .rsplit('/')
            .next()
            .unwrap_or(&self.config.object_key);
        let source = job_dir.join(filename);

        self.storage
            .download_file(&self.config.source_bucket, &self.config.object_key, &source)
            .await?;
        Ok(source)
    }

    /// Transcode every rendition in parallel; the first failure aborts the
    /// remaining conversions.
    async fn transcode_renditions(&self, source: &Path, job_dir: &Path) -> WorkerResult<()> {
        transcode_all(source, job_dir, |source, job_dir, format| async move {
            convert_one(&source, &job_dir, format).await
        })
        .await
    }

    /// Every rendition, the master playlist, and the subtitle track must be
    /// linked before the report goes out.
    fn verify_links(&self, links: &LinkMap) -> WorkerResult<()> {
        let mut missing: Vec<&str> = renditions()
            .iter()
            .map(|f| f.name)
            .filter(|name| links.get(name).is_none())
            .collect();
        if links.get(vodforge_models::MASTER_PLAYLIST_KEY).is_none() {
            missing.push(vodforge_models::MASTER_PLAYLIST_KEY);
        }
        if links.subtitles().is_none() {
            missing.push(vodforge_models::SUBTITLES_KEY);
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(WorkerError::upload_failed(format!(
                "Published links incomplete, missing: {}",
                missing.join(", ")
            )))
        }
    }

    /// Delete the consumed source object and the local work directory.
    async fn cleanup(&self, job_dir: &Path) -> WorkerResult<()> {
        self.storage
            .delete_object(&self.config.source_bucket, &self.config.object_key)
            .await?;
        tokio::fs::remove_dir_all(job_dir).await?;
        info!(object_key = %self.config.object_key, "Source and work directory removed");
        Ok(())
    }
}

/// Fan one conversion task out per rendition and join them all. All
/// renditions must succeed: the first failure aborts the remaining tasks
/// and fails the stage.
async fn transcode_all<C, Fut>(source: &Path, job_dir: &Path, convert: C) -> WorkerResult<()>
where
    C: Fn(PathBuf, PathBuf, &'static vodforge_models::RenditionFormat) -> Fut,
    Fut: std::future::Future<Output = WorkerResult<&'static str>> + Send + 'static,
{
    let mut set = JoinSet::new();
    for format in renditions() {
        set.spawn(convert(source.to_path_buf(), job_dir.to_path_buf(), format));
    }

    while let Some(result) = set.join_next().await {
        match result {
            Ok(Ok(name)) => {
                info!(rendition = name, "Rendition transcoded");
            }
            Ok(Err(e)) => {
                set.abort_all();
                return Err(e);
            }
            Err(e) => {
                set.abort_all();
                return Err(WorkerError::transcode_failed(e.to_string()));
            }
        }
    }
    Ok(())
}

async fn convert_one(
    source: &Path,
    job_dir: &Path,
    format: &'static vodforge_models::RenditionFormat,
) -> WorkerResult<&'static str> {
    vodforge_media::convert_rendition(source, job_dir, format).await?;
    Ok(format.name)
}
