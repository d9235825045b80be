//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "vodforge_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vodforge_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vodforge_http_requests_in_flight";

    // Admission metrics
    pub const JOBS_ADMITTED_TOTAL: &str = "vodforge_jobs_admitted_total";
    pub const JOBS_QUEUED_TOTAL: &str = "vodforge_jobs_queued_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "vodforge_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "vodforge_jobs_failed_total";
    pub const JOBS_REQUEUED_TOTAL: &str = "vodforge_jobs_requeued_total";
    pub const LAUNCH_FAILURES_TOTAL: &str = "vodforge_launch_failures_total";
    pub const ACTIVE_JOBS: &str = "vodforge_active_jobs";
    pub const QUEUE_LENGTH: &str = "vodforge_queue_length";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a job launched into a free slot.
pub fn record_job_admitted() {
    counter!(names::JOBS_ADMITTED_TOTAL).increment(1);
}

/// Record a job parked in the queue.
pub fn record_job_queued() {
    counter!(names::JOBS_QUEUED_TOTAL).increment(1);
}

/// Record a job completed successfully.
pub fn record_job_completed() {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
}

/// Record a job failed.
pub fn record_job_failed() {
    counter!(names::JOBS_FAILED_TOTAL).increment(1);
}

/// Record an orphaned job pushed back into the queue.
pub fn record_job_requeued() {
    counter!(names::JOBS_REQUEUED_TOTAL).increment(1);
}

/// Record a launch rejection.
pub fn record_launch_failure() {
    counter!(names::LAUNCH_FAILURES_TOTAL).increment(1);
}

/// Update the active jobs gauge.
pub fn set_active_jobs(count: i64) {
    gauge!(names::ACTIVE_JOBS).set(count as f64);
}

/// Update the queue length gauge.
pub fn set_queue_length(length: u64) {
    gauge!(names::QUEUE_LENGTH).set(length as f64);
}

/// Sanitize path for metrics labels (collapse object keys, etc.).
fn sanitize_path(path: &str) -> String {
    // Object keys appear only after /videos/
    if let Some(prefix) = path.find("/videos/") {
        return format!("{}/videos/:object_key", &path[..prefix]);
    }
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    // Increment in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    // Decrement in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/api/videos/uploads%2Fvideos%2Fabc.mp4"),
            "/api/videos/:object_key"
        );
        assert_eq!(sanitize_path("/api/trigger/upload"), "/api/trigger/upload");
    }
}
