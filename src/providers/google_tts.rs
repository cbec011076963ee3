//! Google Cloud Text-to-Speech `text:synthesize` client.

use async_trait::async_trait;
use serde_json::json;

use super::{SynthesisProvider, post_json};
use crate::encoding::decode_base64;
use crate::error::{AgentError, Result};
use crate::host::AudioClip;

/// Connection and voice settings.
#[derive(Clone)]
pub struct TextToSpeechConfig {
    pub api_key: String,
    pub base_url: String,
    pub language_code: String,
    pub voice_name: String,
    pub audio_encoding: String,
}

impl TextToSpeechConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://texttospeech.googleapis.com".into(),
            language_code: "en-US".into(),
            voice_name: "en-US-Wavenet-F".into(),
            audio_encoding: "MP3".into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_voice(mut self, language_code: impl Into<String>, name: impl Into<String>) -> Self {
        self.language_code = language_code.into();
        self.voice_name = name.into();
        self
    }

    pub fn with_audio_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.audio_encoding = encoding.into();
        self
    }
}

impl std::fmt::Debug for TextToSpeechConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextToSpeechConfig")
            .field("base_url", &self.base_url)
            .field("voice_name", &self.voice_name)
            .field("audio_encoding", &self.audio_encoding)
            .finish_non_exhaustive()
    }
}

/// MIME type of audio returned for a synthesis encoding.
pub fn mime_for_encoding(encoding: &str) -> &'static str {
    match encoding {
        "MP3" => "audio/mpeg",
        "OGG_OPUS" => "audio/ogg",
        "LINEAR16" => "audio/wav",
        _ => "application/octet-stream",
    }
}

/// HTTP client for Text-to-Speech.
#[derive(Debug)]
pub struct TextToSpeechClient {
    config: TextToSpeechConfig,
    client: reqwest::Client,
}

impl TextToSpeechClient {
    pub fn new(config: TextToSpeechConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: TextToSpeechConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn build_request(&self, text: &str) -> serde_json::Value {
        json!({
            "input": { "text": text },
            "voice": {
                "languageCode": self.config.language_code,
                "name": self.config.voice_name,
            },
            "audioConfig": { "audioEncoding": self.config.audio_encoding },
        })
    }
}

#[async_trait]
impl SynthesisProvider for TextToSpeechClient {
    async fn synthesize(&self, text: &str) -> Result<AudioClip> {
        let url = format!("{}/v1/text:synthesize", self.config.base_url);
        let response = post_json(
            &self.client,
            "Text-to-Speech",
            &url,
            &self.config.api_key,
            &self.build_request(text),
        )
        .await?;

        let audio = response
            .get("audioContent")
            .and_then(|a| a.as_str())
            .filter(|a| !a.is_empty())
            .ok_or_else(|| {
                AgentError::MalformedResponse("Text-to-Speech returned no audioContent".into())
            })?;

        Ok(AudioClip {
            mime_type: mime_for_encoding(&self.config.audio_encoding).to_owned(),
            bytes: decode_base64(audio)?,
        })
    }
}
