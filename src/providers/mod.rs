//! Clients for the three remote services.
//!
//! Each service sits behind a small async trait so the agent can be driven
//! by fakes in tests. [`Providers::from_config`] builds the real HTTP
//! clients, skipping any service whose credential is not configured.

pub mod gemini;
pub mod google_stt;
pub mod google_tts;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{AgentConfig, usable_key};
use crate::error::{AgentError, Result};
use crate::host::AudioClip;
use crate::model::FileAttachment;

pub use gemini::{GeminiClient, GeminiConfig};
pub use google_stt::{SpeechToTextClient, SpeechToTextConfig};
pub use google_tts::{TextToSpeechClient, TextToSpeechConfig};

/// One generation call.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    /// Model name, e.g. `gemini-1.5-flash-latest`.
    pub model: &'a str,
    pub prompt: &'a str,
    /// Attached as an inline data part when present.
    pub file: Option<&'a FileAttachment>,
}

/// Text generation.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Returns the first candidate's text, or `None` when the response had none.
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<Option<String>>;
}

/// Cloud voice synthesis.
#[async_trait]
pub trait SynthesisProvider: Send + Sync {
    /// Returns playable audio for `text`.
    async fn synthesize(&self, text: &str) -> Result<AudioClip>;
}

/// Cloud speech recognition.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Returns the best transcript of a base64-encoded clip, if any.
    async fn transcribe(&self, audio_base64: &str) -> Result<Option<String>>;
}

/// The configured services. A `None` slot means the credential is missing.
#[derive(Clone, Default)]
pub struct Providers {
    pub generation: Option<Arc<dyn GenerationProvider>>,
    pub synthesis: Option<Arc<dyn SynthesisProvider>>,
    pub transcription: Option<Arc<dyn TranscriptionProvider>>,
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Providers")
            .field("generation", &self.generation.is_some())
            .field("synthesis", &self.synthesis.is_some())
            .field("transcription", &self.transcription.is_some())
            .finish()
    }
}

impl Providers {
    /// Build HTTP clients for every service with a usable credential.
    ///
    /// All clients share one connection pool.
    pub fn from_config(config: &AgentConfig) -> Self {
        let client = reqwest::Client::new();

        let generation = usable_key(&config.generation.api_key).map(|key| {
            let cfg = GeminiConfig::new(key).with_base_url(&config.generation.base_url);
            Arc::new(GeminiClient::with_client(cfg, client.clone())) as Arc<dyn GenerationProvider>
        });

        let synthesis = usable_key(&config.synthesis.api_key).map(|key| {
            let cfg = TextToSpeechConfig::new(key)
                .with_base_url(&config.synthesis.base_url)
                .with_voice(&config.synthesis.language_code, &config.synthesis.voice_name)
                .with_audio_encoding(&config.synthesis.audio_encoding);
            Arc::new(TextToSpeechClient::with_client(cfg, client.clone()))
                as Arc<dyn SynthesisProvider>
        });

        let transcription = usable_key(&config.transcription.api_key).map(|key| {
            let cfg = SpeechToTextConfig::new(key)
                .with_base_url(&config.transcription.base_url)
                .with_encoding(
                    &config.transcription.encoding,
                    config.transcription.sample_rate_hertz,
                )
                .with_language_code(&config.transcription.language_code);
            Arc::new(SpeechToTextClient::with_client(cfg, client.clone()))
                as Arc<dyn TranscriptionProvider>
        });

        Self {
            generation,
            synthesis,
            transcription,
        }
    }

    pub fn with_generation(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.generation = Some(provider);
        self
    }

    pub fn with_synthesis(mut self, provider: Arc<dyn SynthesisProvider>) -> Self {
        self.synthesis = Some(provider);
        self
    }

    pub fn with_transcription(mut self, provider: Arc<dyn TranscriptionProvider>) -> Self {
        self.transcription = Some(provider);
        self
    }
}

/// Extract the message of a Google `{"error": {"message": ...}}` envelope.
fn extract_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("error")?
        .get("message")?
        .as_str()
        .map(String::from)
}

/// POST a JSON body with the API key as a query parameter and parse the reply.
///
/// Non-success statuses become [`AgentError::Transport`] carrying the
/// service's own error message when the body has one.
pub(crate) async fn post_json(
    client: &reqwest::Client,
    service: &str,
    url: &str,
    api_key: &str,
    body: &serde_json::Value,
) -> Result<serde_json::Value> {
    let response = client
        .post(url)
        .query(&[("key", api_key)])
        .json(body)
        .send()
        .await
        .map_err(|e| AgentError::Transport(format!("{service} request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        let detail = extract_error_message(&body_text)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        return Err(AgentError::Transport(format!(
            "{service} request failed: {detail}"
        )));
    }

    response.json().await.map_err(|e| {
        AgentError::MalformedResponse(format!("{service} returned invalid JSON: {e}"))
    })
}
