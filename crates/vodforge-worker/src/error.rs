//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Transcode failed: {0}")]
    TranscodeFailed(String),

    #[error("Subtitle generation failed: {0}")]
    SubtitleFailed(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Callback failed: {0}")]
    CallbackFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] vodforge_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] vodforge_media::MediaError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn transcode_failed(msg: impl Into<String>) -> Self {
        Self::TranscodeFailed(msg.into())
    }

    pub fn subtitle_failed(msg: impl Into<String>) -> Self {
        Self::SubtitleFailed(msg.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    pub fn callback_failed(msg: impl Into<String>) -> Self {
        Self::CallbackFailed(msg.into())
    }
}
