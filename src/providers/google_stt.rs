//! Google Cloud Speech-to-Text `speech:recognize` client.

use async_trait::async_trait;
use serde_json::json;

use super::{TranscriptionProvider, post_json};
use crate::error::Result;

#[derive(Clone)]
pub struct SpeechToTextConfig {
    pub api_key: String,
    pub base_url: String,
    pub encoding: String,
    pub sample_rate_hertz: u32,
    pub language_code: String,
}

impl SpeechToTextConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://speech.googleapis.com".into(),
            encoding: "WEBM_OPUS".into(),
            sample_rate_hertz: 48_000,
            language_code: "en-US".into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>, sample_rate_hertz: u32) -> Self {
        self.encoding = encoding.into();
        self.sample_rate_hertz = sample_rate_hertz;
        self
    }

    pub fn with_language_code(mut self, language_code: impl Into<String>) -> Self {
        self.language_code = language_code.into();
        self
    }
}

impl std::fmt::Debug for SpeechToTextConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechToTextConfig")
            .field("base_url", &self.base_url)
            .field("encoding", &self.encoding)
            .field("sample_rate_hertz", &self.sample_rate_hertz)
            .finish_non_exhaustive()
    }
}

/// Best transcript of the first result, if non-empty.
pub fn extract_transcript(response: &serde_json::Value) -> Option<String> {
    response
        .pointer("/results/0/alternatives/0/transcript")
        .and_then(|t| t.as_str())
        .filter(|t| !t.trim().is_empty())
        .map(String::from)
}

#[derive(Debug)]
pub struct SpeechToTextClient {
    config: SpeechToTextConfig,
    client: reqwest::Client,
}

impl SpeechToTextClient {
    pub fn new(config: SpeechToTextConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: SpeechToTextConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn build_request(&self, audio_base64: &str) -> serde_json::Value {
        json!({
            "config": {
                "encoding": self.config.encoding,
                "sampleRateHertz": self.config.sample_rate_hertz,
                "languageCode": self.config.language_code,
            },
            "audio": { "content": audio_base64 },
        })
    }
}

#[async_trait]
impl TranscriptionProvider for SpeechToTextClient {
    async fn transcribe(&self, audio_base64: &str) -> Result<Option<String>> {
        let url = format!("{}/v1/speech:recognize", self.config.base_url);
        let response = post_json(
            &self.client,
            "Speech-to-Text",
            &url,
            &self.config.api_key,
            &self.build_request(audio_base64),
        )
        .await?;
        Ok(extract_transcript(&response))
    }
}
