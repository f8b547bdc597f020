//! HTTP implementation of the conversion endpoint

use crate::config::ClientConfig;
use crate::endpoint::{ConversionEndpoint, ConversionRequest, ConversionResult, ConvertedImage};
use crate::error::{ClientError, ClientResult, GENERIC_FAILURE};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Request correlation ID header
const X_REQUEST_ID: &str = "X-Request-ID";

/// Content type used when the server omits one
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Error body returned by the endpoint
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

/// Health report returned by `GET /health`
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

/// Conversion client over HTTP.
///
/// One multipart POST per file; failures are returned as-is and never retried.
#[derive(Clone)]
pub struct ConvertClient {
    inner: Client,
    config: Arc<ClientConfig>,
}

impl ConvertClient {
    /// Create a new client with configuration from environment
    pub fn new() -> ClientResult<Self> {
        let config = ClientConfig::from_env()?;
        Self::with_config(config)
    }

    /// Create a new client with specific configuration
    pub fn with_config(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;

        let inner = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("imgconv-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientError::Transport)?;

        Ok(Self {
            inner,
            config: Arc::new(config),
        })
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Query the server's health route
    pub async fn health(&self) -> ClientResult<HealthStatus> {
        let response = self.inner.get(self.config.health_url()).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::rejected(response.status().as_u16(), GENERIC_FAILURE));
        }
        Ok(response.json().await?)
    }

    #[instrument(skip(self, request), fields(file_name = ?request.file_name, format = %request.format, request_id))]
    async fn send(&self, request: ConversionRequest) -> ConversionResult {
        let request_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("request_id", request_id.as_str());

        let size = request.bytes.len();
        let mut part = Part::bytes(request.bytes);
        if let Some(name) = request.file_name {
            part = part.file_name(name);
        }
        let form = Form::new().text("format", request.format).part("file", part);

        let start = Instant::now();
        let response = self
            .inner
            .post(self.config.convert_url())
            .header(X_REQUEST_ID, &request_id)
            .multipart(form)
            .send()
            .await?;

        debug!(
            status = response.status().as_u16(),
            upload_bytes = size,
            elapsed_ms = start.elapsed().as_millis(),
            "Conversion response received"
        );

        handle_response(response).await
    }
}

#[async_trait]
impl ConversionEndpoint for ConvertClient {
    async fn convert(&self, request: ConversionRequest) -> ConversionResult {
        self.send(request).await
    }
}

/// Turn a response into converted bytes or a rejection
async fn handle_response(response: Response) -> ConversionResult {
    let status = response.status();

    if status.is_success() {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        let bytes = response.bytes().await?.to_vec();
        return Ok(ConvertedImage { bytes, content_type });
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .ok()
        .and_then(|e| e.error)
        .unwrap_or_else(|| {
            warn!(status = status.as_u16(), "Error response without an error message");
            GENERIC_FAILURE.to_string()
        });

    Err(ClientError::rejected(status.as_u16(), message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(format: &str) -> ConversionRequest {
        ConversionRequest {
            bytes: b"fake image bytes".to_vec(),
            file_name: Some("cat.png".to_string()),
            format: format.to_string(),
        }
    }

    fn client_for(server: &MockServer) -> ConvertClient {
        ConvertClient::with_config(ClientConfig::default().with_base_url(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_success_returns_bytes_and_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/convert"))
            .and(header_exists(X_REQUEST_ID))
            .and(body_string_contains("name=\"format\""))
            .and(body_string_contains("filename=\"cat.png\""))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/webp")
                    .set_body_bytes(b"RIFF0000WEBP".to_vec()),
            )
            .expect(1)
            .mount(&server)
            .await;

        let converted = client_for(&server).convert(request("webp")).await.unwrap();
        assert_eq!(converted.content_type, "image/webp");
        assert_eq!(converted.bytes, b"RIFF0000WEBP");
    }

    #[tokio::test]
    async fn test_rejection_message_is_passed_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/convert"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(serde_json::json!({ "error": "Unsupported format" })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).convert(request("gif")).await.unwrap_err();
        assert!(matches!(err, ClientError::Rejected { status: 400, .. }));
        assert_eq!(err.user_message(), "Unsupported format");
    }

    #[tokio::test]
    async fn test_unstructured_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).convert(request("png")).await.unwrap_err();
        assert!(err.is_server_error());
        assert_eq!(err.user_message(), "Conversion failed");
    }

    #[tokio::test]
    async fn test_no_retry_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(serde_json::json!({ "error": "Failed to convert image" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server).convert(request("png")).await.unwrap_err();
        assert_eq!(err.user_message(), "Failed to convert image");
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        let config = ClientConfig::default()
            .with_base_url("http://127.0.0.1:9")
            .with_timeout(Duration::from_secs(2));
        let client = ConvertClient::with_config(config).unwrap();

        let err = client.convert(request("png")).await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }

    #[tokio::test]
    async fn test_health() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": "ok", "version": "0.3.0" })),
            )
            .mount(&server)
            .await;

        let health = client_for(&server).health().await.unwrap();
        assert_eq!(health.status, "ok");
    }

    #[test]
    fn test_client_creation_validates_config() {
        assert!(ConvertClient::with_config(ClientConfig::default()).is_ok());
        assert!(ConvertClient::with_config(ClientConfig::default().with_base_url("localhost")).is_err());
    }
}
