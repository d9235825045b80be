//! Worker completion callback handler.
//!
//! Workers post their terminal report here. The handler persists the report,
//! frees the admission slot, and drains the queue, replying with everything
//! the drain did in a single response.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::info;

use vodforge_models::{CompletionReport, ProgressState};

use crate::error::{ApiError, ApiResult};
use crate::scheduler::DrainSummary;
use crate::state::AppState;

/// Completion callback response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    pub object_key: String,
    pub progress: ProgressState,
    pub drain: DrainSummary,
}

/// Handle a worker completion callback.
pub async fn trigger_worker(
    State(state): State<AppState>,
    Json(report): Json<CompletionReport>,
) -> ApiResult<Json<CompletionResponse>> {
    if report.object_key.trim().is_empty() {
        return Err(ApiError::bad_request("objectKey must not be empty"));
    }

    // Unknown keys are rejected before the slot accounting is touched.
    if state.store.find(&report.object_key).await?.is_none() {
        return Err(ApiError::not_found(format!(
            "No video record for key {}",
            report.object_key
        )));
    }

    let drain = state.scheduler.complete(&report).await?;

    info!(
        object_key = %report.object_key,
        launched = drain.launched.len(),
        "Completion processed"
    );

    Ok(Json(CompletionResponse {
        object_key: report.object_key,
        progress: report.progress,
        drain,
    }))
}
