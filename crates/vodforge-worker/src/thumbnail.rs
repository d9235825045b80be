//! Best-effort thumbnail generation via the collaborator endpoint.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::WorkerConfig;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThumbnailRequest<'a> {
    object_key: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThumbnailResponse {
    thumbnail_url: Option<String>,
}

/// Ask the thumbnail collaborator to generate a thumbnail for the source.
///
/// Thumbnails are cosmetic; any failure here degrades the job to "no
/// thumbnail" rather than failing it.
pub async fn request_thumbnail(
    http: &reqwest::Client,
    config: &WorkerConfig,
) -> Option<String> {
    let endpoint = config.thumbnail_endpoint.as_deref()?;

    let response = http
        .post(endpoint)
        .json(&ThumbnailRequest {
            object_key: &config.object_key,
        })
        .send()
        .await;

    let response = match response {
        Ok(r) => r,
        Err(e) => {
            warn!("Thumbnail request failed: {}", e);
            return None;
        }
    };

    if !response.status().is_success() {
        warn!(status = %response.status(), "Thumbnail endpoint returned error");
        return None;
    }

    match response.json::<ThumbnailResponse>().await {
        Ok(body) => {
            if let Some(url) = &body.thumbnail_url {
                info!(url = %url, "Thumbnail generated");
            }
            body.thumbnail_url
        }
        Err(e) => {
            warn!("Thumbnail response was not parseable: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(endpoint: Option<String>) -> WorkerConfig {
        WorkerConfig {
            object_key: "uploads/videos/demo.mp4".to_string(),
            source_bucket: "src".to_string(),
            dest_bucket: "dst".to_string(),
            webhook_url: "http://api/api/trigger/worker".to_string(),
            cdn_domain: "cdn.example.com".to_string(),
            region: "us-east-1".to_string(),
            thumbnail_endpoint: endpoint,
            work_dir: "/tmp/vodforge".to_string(),
            subtitle_poll_interval: Duration::from_secs(10),
            subtitle_poll_cap: Duration::from_secs(60),
            subtitle_deadline: Duration::from_secs(1800),
        }
    }

    #[tokio::test]
    async fn returns_url_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/thumbnail"))
            .and(body_partial_json(serde_json::json!({
                "objectKey": "uploads/videos/demo.mp4"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "thumbnailUrl": "https://cdn.example.com/videos/demo/thumb.jpg"
            })))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let url = request_thumbnail(&http, &config(Some(format!("{}/thumbnail", server.uri())))).await;
        assert_eq!(
            url.as_deref(),
            Some("https://cdn.example.com/videos/demo/thumb.jpg")
        );
    }

    #[tokio::test]
    async fn degrades_to_none_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let url = request_thumbnail(&http, &config(Some(server.uri()))).await;
        assert!(url.is_none());
    }

    #[tokio::test]
    async fn skips_when_endpoint_unconfigured() {
        let http = reqwest::Client::new();
        assert!(request_thumbnail(&http, &config(None)).await.is_none());
    }
}
