//! Capabilities the agent needs from its host.
//!
//! The agent never touches an audio device, a speech engine or a browser
//! directly. A host (terminal, desktop shell, test harness) supplies these
//! small traits and the agent drives them.

pub mod console;

use std::sync::Arc;

use crate::error::Result;

/// Encoded audio ready for playback.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioClip {
    /// MIME type of `bytes`, e.g. `audio/mpeg`.
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for AudioClip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioClip")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// The platform's built-in speech synthesizer.
pub trait OnDeviceSpeech: Send + Sync + 'static {
    /// Start speaking one utterance immediately.
    fn speak(&self, text: &str);
    /// Cancel the current and any pending utterances.
    fn cancel(&self);
}

/// Plays decoded audio clips.
pub trait AudioOutput: Send + Sync + 'static {
    /// Start playing `clip` and return a handle to the running playback.
    fn play(&self, clip: AudioClip) -> Result<Box<dyn Playback>>;
}

/// A running playback.
pub trait Playback: Send {
    /// Stop playing and release the output.
    fn stop(&mut self);
    /// Whether playback reached its end.
    fn is_finished(&mut self) -> bool;
}

/// Opens URLs in a new viewing context.
pub trait Navigator: Send + Sync + 'static {
    fn open_url(&self, url: &str) -> Result<()>;
}

/// Bundle of host capabilities handed to the agent.
#[derive(Clone)]
pub struct HostCapabilities {
    pub speech: Arc<dyn OnDeviceSpeech>,
    pub audio: Arc<dyn AudioOutput>,
    pub navigator: Arc<dyn Navigator>,
}

impl HostCapabilities {
    pub fn new(
        speech: Arc<dyn OnDeviceSpeech>,
        audio: Arc<dyn AudioOutput>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            speech,
            audio,
            navigator,
        }
    }
}

impl std::fmt::Debug for HostCapabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostCapabilities").finish_non_exhaustive()
    }
}
