//! Configuration types for the agent core.
//!
//! Every section is `#[serde(default)]`, so a partial TOML file (or none at
//! all) always yields a usable config. Service credentials are optional; a
//! missing one disables that service and the agent degrades instead.

use crate::error::AgentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Environment variable overriding [`GenerationConfig::api_key`].
pub const GENERATION_KEY_ENV: &str = "FRIDAY_GEMINI_API_KEY";
/// Environment variable overriding [`SynthesisConfig::api_key`].
pub const SYNTHESIS_KEY_ENV: &str = "FRIDAY_TTS_API_KEY";
/// Environment variable overriding [`TranscriptionConfig::api_key`].
pub const TRANSCRIPTION_KEY_ENV: &str = "FRIDAY_STT_API_KEY";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Text generation service (answers, summaries, suggestions).
    pub generation: GenerationConfig,
    /// Cloud voice synthesis.
    pub synthesis: SynthesisConfig,
    /// Cloud speech recognition.
    pub transcription: TranscriptionConfig,
    /// Session snapshot storage.
    pub storage: StorageConfig,
}

/// Generation service configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// API key; `None` disables generation.
    pub api_key: Option<String>,
    /// Base URL of the `generateContent` API.
    pub base_url: String,
    /// Model used for answering prompts.
    pub model: String,
    /// Model used for summaries and follow-up suggestions.
    pub utility_model: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_owned(),
            model: "gemini-1.5-flash-latest".to_owned(),
            utility_model: "gemini-2.0-flash".to_owned(),
        }
    }
}

/// Voice synthesis configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// API key; `None` routes all speech to the on-device voice.
    pub api_key: Option<String>,
    /// Base URL of the `text:synthesize` API.
    pub base_url: String,
    /// BCP-47 locale of the voice.
    pub language_code: String,
    /// Voice name within the locale.
    pub voice_name: String,
    /// Encoding of the returned audio.
    pub audio_encoding: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://texttospeech.googleapis.com".to_owned(),
            language_code: "en-US".to_owned(),
            voice_name: "en-US-Wavenet-F".to_owned(),
            audio_encoding: "MP3".to_owned(),
        }
    }
}

/// Speech recognition configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// API key; `None` makes transcription fail fast with a message.
    pub api_key: Option<String>,
    /// Base URL of the `speech:recognize` API.
    pub base_url: String,
    /// Encoding of recorded clips.
    pub encoding: String,
    /// Sample rate of recorded clips.
    pub sample_rate_hertz: u32,
    /// Recognition locale.
    pub language_code: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://speech.googleapis.com".to_owned(),
            encoding: "WEBM_OPUS".to_owned(),
            sample_rate_hertz: 48_000,
            language_code: "en-US".to_owned(),
        }
    }
}

/// Snapshot storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one JSON file per store key.
    pub data_dir: PathBuf,
    /// Key the session snapshot is stored under.
    pub session_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            session_key: "friday-threads".to_owned(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("friday")
}

// Keys never reach logs.
fn redact(key: &Option<String>) -> &'static str {
    match key {
        Some(k) if !k.is_empty() => "[REDACTED]",
        _ => "<unset>",
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("utility_model", &self.utility_model)
            .finish()
    }
}

impl fmt::Debug for SynthesisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesisConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("language_code", &self.language_code)
            .field("voice_name", &self.voice_name)
            .field("audio_encoding", &self.audio_encoding)
            .finish()
    }
}

impl fmt::Debug for TranscriptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscriptionConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("encoding", &self.encoding)
            .field("sample_rate_hertz", &self.sample_rate_hertz)
            .field("language_code", &self.language_code)
            .finish()
    }
}

/// Returns the key only when it is set and non-blank.
pub(crate) fn usable_key(key: &Option<String>) -> Option<&str> {
    key.as_deref().map(str::trim).filter(|k| !k.is_empty())
}

impl AgentConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AgentError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&content).map_err(|e| AgentError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        let write_err = |e: std::io::Error| {
            AgentError::Config(format!("cannot write {}: {e}", path.display()))
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AgentError::Config(e.to_string()))?;
        std::fs::write(path, content).map_err(write_err)?;
        Ok(())
    }

    /// Returns the default config file path (`~/.config/friday/config.toml`).
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("friday")
            .join("config.toml")
    }

    /// Overlay credentials from the environment.
    ///
    /// A non-empty environment variable wins over the file value.
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_overrides(|name| std::env::var(name).ok());
        self
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let pick = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(key) = pick(GENERATION_KEY_ENV) {
            self.generation.api_key = Some(key);
        }
        if let Some(key) = pick(SYNTHESIS_KEY_ENV) {
            self.synthesis.api_key = Some(key);
        }
        if let Some(key) = pick(TRANSCRIPTION_KEY_ENV) {
            self.transcription.api_key = Some(key);
        }
    }
}
