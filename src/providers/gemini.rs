//! Gemini `generateContent` client.
//!
//! Sends one user turn made of a text part and an optional inline data part
//! and reads back the first candidate's first text part.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{GenerationProvider, GenerationRequest, post_json};
use crate::error::Result;

/// Connection settings for the Gemini API.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    /// Defaults to `https://generativelanguage.googleapis.com`.
    pub base_url: String,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com".into(),
        }
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_owned();
        self
    }
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Build the `generateContent` request body.
pub fn build_generate_request(request: &GenerationRequest<'_>) -> serde_json::Value {
    let mut parts = vec![json!({ "text": request.prompt })];
    if let Some(file) = request.file {
        parts.push(json!({
            "inline_data": {
                "mime_type": file.mime_type,
                "data": file.base64,
            }
        }));
    }
    json!({ "contents": [{ "parts": parts }] })
}

/// First candidate's first text part, if non-empty.
pub fn extract_candidate_text(response: &serde_json::Value) -> Option<String> {
    response
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .map(String::from)
}

/// HTTP client for Gemini.
#[derive(Debug)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Reuse an existing connection pool.
    pub fn with_client(config: GeminiConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{model}:generateContent",
            self.config.base_url
        )
    }
}

#[async_trait]
impl GenerationProvider for GeminiClient {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<Option<String>> {
        let url = self.endpoint(request.model);
        let body = build_generate_request(&request);
        debug!(
            model = request.model,
            with_file = request.file.is_some(),
            "sending generateContent"
        );
        let response = post_json(&self.client, "Gemini", &url, &self.config.api_key, &body).await?;
        Ok(extract_candidate_text(&response))
    }
}
