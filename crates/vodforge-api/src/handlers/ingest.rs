//! Upload trigger handler.
//!
//! Invoked by the storage event bridge when a new source lands in the temp
//! bucket. Creates (or refreshes) the metadata record and hands the job to
//! the admission controller.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use vodforge_models::{key_stem, ProgressState, TranscodeJob, VideoRecord};

use crate::error::{ApiError, ApiResult};
use crate::scheduler::Admission;
use crate::state::AppState;

/// Upload trigger payload.
#[derive(Debug, Deserialize)]
pub struct UploadTrigger {
    /// Object key of the uploaded source
    pub key: String,
    /// Upload metadata supplied by the uploader
    pub metadata: UploadMetadata,
}

#[derive(Debug, Deserialize)]
pub struct UploadMetadata {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Upload trigger response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub object_key: String,
    pub progress: ProgressState,
    /// Absent when the job was already in flight and nothing was admitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admission: Option<Admission>,
}

/// Handle an upload trigger: record the video and admit the transcode job.
pub async fn trigger_upload(
    State(state): State<AppState>,
    Json(payload): Json<UploadTrigger>,
) -> ApiResult<Json<UploadResponse>> {
    if payload.key.trim().is_empty() {
        return Err(ApiError::bad_request("key must not be empty"));
    }
    if payload.metadata.user_id.trim().is_empty() {
        return Err(ApiError::bad_request("metadata.userId must not be empty"));
    }

    // Duplicate trigger for a job already in flight is a no-op; storage
    // event deliveries are at-least-once.
    if let Some(existing) = state.store.find(&payload.key).await? {
        if !existing.progress.is_terminal() && existing.progress != ProgressState::Pending {
            warn!(
                object_key = %payload.key,
                progress = %existing.progress,
                "Duplicate upload trigger for job in flight"
            );
            return Ok(Json(UploadResponse {
                object_key: existing.object_key,
                progress: existing.progress,
                admission: None,
            }));
        }
    }

    let record = VideoRecord::new(
        &payload.key,
        key_stem(&payload.key),
        &payload.metadata.user_id,
        &payload.metadata.title,
        &payload.metadata.description,
    );
    state.store.upsert(&record).await?;

    info!(
        object_key = %payload.key,
        user_id = %payload.metadata.user_id,
        "Upload trigger received"
    );

    let job = TranscodeJob::from_key(&payload.key);
    let admission = state.scheduler.admit(job).await?;

    let progress = match admission {
        Admission::Launched => ProgressState::Processing,
        Admission::Queued => ProgressState::Queued,
    };

    Ok(Json(UploadResponse {
        object_key: payload.key,
        progress,
        admission: Some(admission),
    }))
}
