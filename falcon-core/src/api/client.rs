//! HTTP client for the fal.ai synchronous run API

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use crate::error::{Error, Result};

use super::request::{GenerateRequest, Prepared, RemoveBackgroundRequest, UpscaleRequest};
use super::{FalResponse, ResponseBody};

/// Production API host.
pub const DEFAULT_BASE_URL: &str = "https://fal.run";

/// Client for the fal.ai model endpoints
///
/// No retries and no request timeout: generation can legitimately take minutes.
#[derive(Debug, Clone)]
pub struct FalClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl FalClient {
    /// Create a client against the production host.
    pub fn new(api_key: impl AsRef<str>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client against an alternative host (proxies, tests).
    pub fn with_base_url(api_key: impl AsRef<str>, base_url: impl AsRef<str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut auth = HeaderValue::from_str(&format!("Key {}", api_key.as_ref()))
            .map_err(|e| Error::Validation(format!("invalid API key: {}", e)))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Generate (or edit) images.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<FalResponse> {
        self.send(request.prepare()?).await
    }

    /// Upscale an image.
    pub async fn upscale(&self, request: &UpscaleRequest) -> Result<FalResponse> {
        self.send(request.prepare()?).await
    }

    /// Remove the background of an image.
    pub async fn remove_background(&self, request: &RemoveBackgroundRequest) -> Result<FalResponse> {
        self.send(request.prepare()?).await
    }

    async fn send(&self, prepared: Prepared) -> Result<FalResponse> {
        let url = format!("{}/{}", self.base_url, prepared.path);
        tracing::info!(endpoint = %prepared.path, "POST");

        let response = self
            .http_client
            .post(&url)
            .json(&prepared.body)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Transport(format!("failed to read response: {}", e)))?;
        tracing::debug!(status = status.as_u16(), bytes = text.len(), "Response received");

        interpret(status, &text)
    }
}

/// Map a raw response onto a typed result.
///
/// A `detail` field always wins: it is the service's own error message.
fn interpret(status: reqwest::StatusCode, text: &str) -> Result<FalResponse> {
    let value: Option<Value> = serde_json::from_str(text).ok();

    if let Some(detail) = value.as_ref().and_then(|v| v.get("detail")) {
        let message = match detail {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        tracing::warn!(status = status.as_u16(), %message, "Remote error");
        return Err(Error::Remote(message));
    }

    if !status.is_success() {
        return Err(Error::Transport(format!("HTTP {}: {}", status, text.trim())));
    }

    let value = value.ok_or_else(|| Error::Transport("response was not valid JSON".to_string()))?;
    let body: ResponseBody = serde_json::from_value(value)
        .map_err(|e| Error::Transport(format!("unexpected response shape: {}", e)))?;
    Ok(body.into())
}
