//! Subtitle track generation via AWS Transcribe.
//!
//! Starts a transcription job against the uploaded source, polls it to a
//! terminal state under a hard deadline, then moves the emitted WebVTT file
//! to its published key. The whole stage is idempotent: if the published
//! subtitle object already exists the job is skipped entirely.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_transcribe::types::{
    LanguageCode, Media, SubtitleFormat, Subtitles, TranscriptionJobStatus,
};
use tracing::{info, warn};

use vodforge_storage::StorageClient;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// Where a transcription job currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionStatus {
    Pending,
    Completed,
    Failed(String),
}

/// Transcription job control.
#[async_trait]
pub trait Transcription: Send + Sync {
    /// Submit a job for the configured source object.
    async fn start(&self, job_name: &str) -> WorkerResult<()>;
    /// Current status of a previously submitted job.
    async fn status(&self, job_name: &str) -> WorkerResult<TranscriptionStatus>;
}

/// Subtitle object bookkeeping in the destination bucket.
#[async_trait]
pub trait SubtitleArtifacts: Send + Sync {
    /// Whether the published subtitle object already exists.
    async fn published(&self, key: &str) -> WorkerResult<bool>;
    /// Move the transcription output to its published key.
    async fn promote(&self, from: &str, to: &str) -> WorkerResult<()>;
    /// Delete a transcription byproduct.
    async fn discard(&self, key: &str) -> WorkerResult<()>;
}

/// Subtitle generator for one transcode job.
pub struct SubtitleGenerator {
    jobs: Arc<dyn Transcription>,
    artifacts: Arc<dyn SubtitleArtifacts>,
    config: WorkerConfig,
}

impl SubtitleGenerator {
    pub fn new(config: WorkerConfig, storage: StorageClient) -> WorkerResult<Self> {
        let require = |name: &str| {
            std::env::var(name).map_err(|_| WorkerError::config_error(format!("{name} not set")))
        };
        let credentials = Credentials::new(
            require("AWS_ACCESS_KEY_ID")?,
            require("AWS_SECRET_ACCESS_KEY")?,
            None,
            None,
            "vodforge",
        );

        let sdk_config = aws_sdk_transcribe::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(aws_sdk_transcribe::config::Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .build();

        let jobs = Arc::new(TranscribeJobs {
            client: aws_sdk_transcribe::Client::from_conf(sdk_config),
            config: config.clone(),
        });
        let artifacts = Arc::new(BucketArtifacts {
            storage,
            bucket: config.dest_bucket.clone(),
        });
        Ok(Self {
            jobs,
            artifacts,
            config,
        })
    }

    /// Published key of the subtitle track.
    pub fn subtitle_key(&self) -> String {
        format!("{}/subtitles.vtt", self.config.publish_prefix())
    }

    /// Generate the subtitle track and return its public URL.
    pub async fn generate(&self) -> WorkerResult<String> {
        let subtitle_key = self.subtitle_key();

        // Relaunched workers for the same key reuse the finished track.
        if self.artifacts.published(&subtitle_key).await? {
            info!(key = %subtitle_key, "Subtitle track already published, skipping");
            return Ok(self.config.public_url(&subtitle_key));
        }

        let job_name = format!(
            "video-{}-subtitles",
            vodforge_models::key_stem(&self.config.object_key)
        );
        self.jobs.start(&job_name).await?;
        self.poll_until_done(&job_name).await?;

        // Transcribe drops the VTT at {job_name}.vtt in the output bucket;
        // move it to its published key.
        self.artifacts
            .promote(&format!("{job_name}.vtt"), &subtitle_key)
            .await?;

        self.cleanup_intermediates(&job_name).await;

        info!(key = %subtitle_key, "Subtitle track published");
        Ok(self.config.public_url(&subtitle_key))
    }

    /// Poll with exponential backoff until the job reaches a terminal state
    /// or the deadline expires.
    async fn poll_until_done(&self, job_name: &str) -> WorkerResult<()> {
        let started = Instant::now();
        let mut delay = self.config.subtitle_poll_interval;

        loop {
            if started.elapsed() > self.config.subtitle_deadline {
                return Err(WorkerError::subtitle_failed(format!(
                    "Transcription job {job_name} exceeded deadline of {:?}",
                    self.config.subtitle_deadline
                )));
            }

            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(self.config.subtitle_poll_cap);

            match self.jobs.status(job_name).await? {
                TranscriptionStatus::Completed => return Ok(()),
                TranscriptionStatus::Failed(reason) => {
                    return Err(WorkerError::subtitle_failed(format!(
                        "Transcription job {job_name} failed: {reason}"
                    )));
                }
                TranscriptionStatus::Pending => {
                    // Queued or in progress; keep waiting.
                }
            }
        }
    }

    /// Best-effort removal of the transcription byproducts.
    async fn cleanup_intermediates(&self, job_name: &str) {
        let intermediates = [
            format!("{job_name}.vtt"),
            format!("{job_name}.json"),
            ".write_access_check_file.temp".to_string(),
        ];
        for key in intermediates {
            if let Err(e) = self.artifacts.discard(&key).await {
                warn!(key = %key, "Failed to delete transcription byproduct: {}", e);
            }
        }
    }
}

/// AWS Transcribe implementation of [`Transcription`].
struct TranscribeJobs {
    client: aws_sdk_transcribe::Client,
    config: WorkerConfig,
}

#[async_trait]
impl Transcription for TranscribeJobs {
    async fn start(&self, job_name: &str) -> WorkerResult<()> {
        let media_uri = format!(
            "s3://{}/{}",
            self.config.source_bucket, self.config.object_key
        );

        self.client
            .start_transcription_job()
            .transcription_job_name(job_name)
            .language_code(LanguageCode::EnUs)
            .media(Media::builder().media_file_uri(media_uri).build())
            .output_bucket_name(&self.config.dest_bucket)
            .subtitles(Subtitles::builder().formats(SubtitleFormat::Vtt).build())
            .send()
            .await
            .map_err(|e| WorkerError::subtitle_failed(e.to_string()))?;

        info!(job = %job_name, "Transcription job started");
        Ok(())
    }

    async fn status(&self, job_name: &str) -> WorkerResult<TranscriptionStatus> {
        let output = self
            .client
            .get_transcription_job()
            .transcription_job_name(job_name)
            .send()
            .await
            .map_err(|e| WorkerError::subtitle_failed(e.to_string()))?;

        let Some(job) = output.transcription_job() else {
            return Err(WorkerError::subtitle_failed(format!(
                "Transcription job {job_name} disappeared"
            )));
        };

        Ok(match job.transcription_job_status() {
            Some(TranscriptionJobStatus::Completed) => TranscriptionStatus::Completed,
            Some(TranscriptionJobStatus::Failed) => TranscriptionStatus::Failed(
                job.failure_reason().unwrap_or("unknown").to_string(),
            ),
            _ => TranscriptionStatus::Pending,
        })
    }
}

/// S3 implementation of [`SubtitleArtifacts`] over the destination bucket.
struct BucketArtifacts {
    storage: StorageClient,
    bucket: String,
}

#[async_trait]
impl SubtitleArtifacts for BucketArtifacts {
    async fn published(&self, key: &str) -> WorkerResult<bool> {
        Ok(self.storage.exists(&self.bucket, key).await?)
    }

    async fn promote(&self, from: &str, to: &str) -> WorkerResult<()> {
        self.storage
            .copy_object(&self.bucket, from, to, "text/vtt")
            .await?;
        Ok(())
    }

    async fn discard(&self, key: &str) -> WorkerResult<()> {
        self.storage.delete_object(&self.bucket, key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    fn test_config() -> WorkerConfig {
        WorkerConfig {
            object_key: "uploads/videos/demo.mp4".to_string(),
            source_bucket: "src".to_string(),
            dest_bucket: "dst".to_string(),
            webhook_url: "http://api/api/trigger/worker".to_string(),
            cdn_domain: "cdn.example.com".to_string(),
            region: "us-east-1".to_string(),
            thumbnail_endpoint: None,
            work_dir: "/tmp/vodforge".to_string(),
            subtitle_poll_interval: Duration::from_millis(5),
            subtitle_poll_cap: Duration::from_millis(10),
            subtitle_deadline: Duration::from_millis(100),
        }
    }

    struct FakeTranscription {
        started: Mutex<Vec<String>>,
        outcome: TranscriptionStatus,
    }

    impl FakeTranscription {
        fn with_outcome(outcome: TranscriptionStatus) -> Self {
            Self {
                started: Mutex::new(Vec::new()),
                outcome,
            }
        }

        fn starts(&self) -> Vec<String> {
            self.started.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transcription for FakeTranscription {
        async fn start(&self, job_name: &str) -> WorkerResult<()> {
            self.started.lock().unwrap().push(job_name.to_string());
            Ok(())
        }

        async fn status(&self, _job_name: &str) -> WorkerResult<TranscriptionStatus> {
            Ok(self.outcome.clone())
        }
    }

    #[derive(Default)]
    struct FakeArtifacts {
        existing: bool,
        promoted: Mutex<Vec<(String, String)>>,
        discarded: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SubtitleArtifacts for FakeArtifacts {
        async fn published(&self, _key: &str) -> WorkerResult<bool> {
            Ok(self.existing)
        }

        async fn promote(&self, from: &str, to: &str) -> WorkerResult<()> {
            self.promoted
                .lock()
                .unwrap()
                .push((from.to_string(), to.to_string()));
            Ok(())
        }

        async fn discard(&self, key: &str) -> WorkerResult<()> {
            self.discarded.lock().unwrap().push(key.to_string());
            Ok(())
        }
    }

    fn generator(
        jobs: Arc<FakeTranscription>,
        artifacts: Arc<FakeArtifacts>,
    ) -> SubtitleGenerator {
        SubtitleGenerator {
            jobs,
            artifacts,
            config: test_config(),
        }
    }

    #[tokio::test]
    async fn published_track_is_reused_without_a_new_job() {
        let jobs = Arc::new(FakeTranscription::with_outcome(
            TranscriptionStatus::Completed,
        ));
        let artifacts = Arc::new(FakeArtifacts {
            existing: true,
            ..Default::default()
        });

        let url = generator(jobs.clone(), artifacts.clone())
            .generate()
            .await
            .unwrap();

        assert_eq!(url, "https://cdn.example.com/videos/demo/subtitles.vtt");
        assert!(jobs.starts().is_empty());
        assert!(artifacts.promoted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn completed_job_is_promoted_to_its_published_key() {
        let jobs = Arc::new(FakeTranscription::with_outcome(
            TranscriptionStatus::Completed,
        ));
        let artifacts = Arc::new(FakeArtifacts::default());

        let url = generator(jobs.clone(), artifacts.clone())
            .generate()
            .await
            .unwrap();

        assert_eq!(url, "https://cdn.example.com/videos/demo/subtitles.vtt");
        assert_eq!(jobs.starts(), vec!["video-demo-subtitles"]);
        assert_eq!(
            *artifacts.promoted.lock().unwrap(),
            vec![(
                "video-demo-subtitles.vtt".to_string(),
                "videos/demo/subtitles.vtt".to_string()
            )]
        );
        let discarded = artifacts.discarded.lock().unwrap().clone();
        assert!(discarded.contains(&"video-demo-subtitles.json".to_string()));
    }

    #[tokio::test]
    async fn failed_job_surfaces_the_reason() {
        let jobs = Arc::new(FakeTranscription::with_outcome(TranscriptionStatus::Failed(
            "unsupported media".to_string(),
        )));
        let artifacts = Arc::new(FakeArtifacts::default());

        let err = generator(jobs, artifacts.clone())
            .generate()
            .await
            .unwrap_err();

        assert!(err.to_string().contains("unsupported media"));
        assert!(artifacts.promoted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stalled_job_hits_the_deadline() {
        let jobs = Arc::new(FakeTranscription::with_outcome(TranscriptionStatus::Pending));
        let artifacts = Arc::new(FakeArtifacts::default());

        let err = generator(jobs, artifacts).generate().await.unwrap_err();
        assert!(err.to_string().contains("deadline"));
    }
}
