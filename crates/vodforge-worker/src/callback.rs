//! Completion callback to the API server.

use tracing::{info, warn};

use vodforge_models::CompletionReport;

use crate::error::{WorkerError, WorkerResult};

/// Post the terminal report to the webhook.
///
/// A non-success response is logged and swallowed: the report was delivered
/// and the API's reconciler covers the case where it was not processed. A
/// transport failure is an error because nothing reached the API at all.
pub async fn post_report(
    http: &reqwest::Client,
    webhook_url: &str,
    report: &CompletionReport,
) -> WorkerResult<()> {
    let response = http
        .post(webhook_url)
        .json(report)
        .send()
        .await
        .map_err(|e| WorkerError::callback_failed(e.to_string()))?;

    if response.status().is_success() {
        info!(
            object_key = %report.object_key,
            progress = %report.progress,
            "Completion report delivered"
        );
    } else {
        warn!(
            object_key = %report.object_key,
            status = %response.status(),
            "Completion report rejected by API"
        );
    }

    Ok(())
}
