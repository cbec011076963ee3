//! Speech output and speech input.
//!
//! Output prefers the cloud voice and degrades to the on-device voice. There
//! is a single playback slot: every new utterance stops the previous one
//! first, and nothing is queued. Each stop bumps an epoch so a synthesis
//! result that lands after a newer utterance, a stop or a mute is dropped.

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use super::{Agent, IdleOnDrop};
use crate::encoding::{data_url_payload, to_data_url};
use crate::error::{AgentError, Result};
use crate::host::Playback;
use crate::model::{AgentStatus, Sender, ThreadId};
use crate::speech_text::clean_for_speech;

/// Announced once when no synthesis credential is configured.
pub const NO_CLOUD_VOICE_ANNOUNCEMENT: &str =
    "No cloud voice API key found. Using the standard on-device voice.";
/// Announced once when the first cloud clip plays.
pub const PREMIUM_ANNOUNCEMENT: &str = "Premium voice enabled.";
/// Announced once when cloud synthesis fails.
pub const FALLBACK_ANNOUNCEMENT: &str =
    "Premium voice API failed. Falling back to the standard on-device voice.";

const UNTRANSCRIBED: &str = "I received your audio but could not transcribe it.";
const TRANSCRIPTION_KEY_MISSING: &str = "Speech recognition API key not found.";

#[derive(Default)]
struct PlaybackSlot {
    epoch: u64,
    current: Option<Box<dyn Playback>>,
}

impl PlaybackSlot {
    /// The only place a playback handle is replaced; the old one is always stopped.
    fn replace(&mut self, next: Option<Box<dyn Playback>>) {
        if let Some(mut previous) = std::mem::replace(&mut self.current, next) {
            previous.stop();
        }
    }
}

/// The single active-playback slot.
#[derive(Default)]
pub(super) struct SpeechOutput {
    slot: Mutex<PlaybackSlot>,
}

impl SpeechOutput {
    fn lock(&self) -> MutexGuard<'_, PlaybackSlot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Agent {
    /// Stop any playback and on-device utterance.
    ///
    /// Returns the new epoch; synthesis started before this call is stale.
    pub fn stop_audio(&self) -> u64 {
        let epoch = {
            let mut slot = self.inner.speech.lock();
            slot.epoch += 1;
            slot.replace(None);
            slot.epoch
        };
        self.inner.host.speech.cancel();
        epoch
    }

    /// Whether a cloud clip is currently playing.
    pub fn is_playing(&self) -> bool {
        let mut slot = self.inner.speech.lock();
        let finished = match slot.current.as_mut() {
            Some(playback) => playback.is_finished(),
            None => return false,
        };
        if finished {
            slot.current = None;
        }
        !finished
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.inner.speech.lock().epoch == epoch
    }

    /// Install a playback unless a newer stop happened since `epoch`.
    fn install_playback(&self, epoch: u64, mut playback: Box<dyn Playback>) -> bool {
        let mut slot = self.inner.speech.lock();
        if slot.epoch != epoch {
            playback.stop();
            return false;
        }
        slot.replace(Some(playback));
        true
    }

    // Lands in the thread the speech belongs to and keeps its suggestions.
    fn announce_once(&self, thread: Option<ThreadId>, message: &str) {
        self.mutate(|s| {
            let Some(thread) = thread.or_else(|| s.active_thread_id()) else {
                return;
            };
            if s.announcement_mut().claim() {
                s.append_notice_to(thread, message);
            }
        });
    }

    fn speak_on_device(&self, text: &str) {
        self.inner.host.speech.speak(text);
    }

    pub(super) fn spawn_speech(&self, thread: ThreadId, text: String) {
        let agent = self.clone();
        self.spawn(async move { agent.speak_in(Some(thread), &text).await });
    }

    /// Speak assistant text, preempting whatever is playing.
    ///
    /// Voice announcements go to the thread active at call time.
    pub async fn speak(&self, raw: &str) {
        let thread = self.with_state(|s| s.active_thread_id());
        self.speak_in(thread, raw).await;
    }

    async fn speak_in(&self, thread: Option<ThreadId>, raw: &str) {
        if self.with_state(|s| s.is_muted()) {
            return;
        }
        let text = clean_for_speech(raw);
        if text.is_empty() {
            return;
        }

        let epoch = self.stop_audio();
        let use_cloud = self.with_state(|s| s.use_cloud_voice());
        if !use_cloud {
            self.speak_on_device(&text);
            return;
        }
        let Some(provider) = self.inner.providers.synthesis.clone() else {
            self.announce_once(thread, NO_CLOUD_VOICE_ANNOUNCEMENT);
            self.speak_on_device(&text);
            return;
        };

        let outcome = match provider.synthesize(&text).await {
            Ok(clip) => {
                if !self.is_current(epoch) {
                    debug!("dropping synthesis result superseded by newer audio");
                    return;
                }
                self.announce_once(thread, PREMIUM_ANNOUNCEMENT);
                self.inner
                    .host
                    .audio
                    .play(clip)
                    .map(|playback| self.install_playback(epoch, playback))
            }
            Err(e) => Err(e),
        };

        if let Err(e) = outcome {
            warn!("cloud voice failed, using on-device voice: {e}");
            if !self.is_current(epoch) {
                return;
            }
            self.announce_once(thread, FALLBACK_ANNOUNCEMENT);
            self.speak_on_device(&text);
        }
    }

    /// Transcribe a recorded clip and handle the transcript as user input.
    pub async fn transcribe(&self, clip: &[u8], mime_type: &str) {
        self.set_status(AgentStatus::Thinking);
        let _idle = IdleOnDrop::new(self);

        match self.recognize(clip, mime_type).await {
            Ok(Some(transcript)) => {
                debug!(chars = transcript.len(), "transcribed clip");
                self.handle_user_input(&transcript).await;
            }
            Ok(None) => {
                self.mutate(|s| s.append_message(Sender::Assistant, UNTRANSCRIBED, None));
            }
            Err(e) => {
                warn!("transcription failed: {e}");
                let message = format!(
                    "There was an error with premium speech recognition. {}",
                    e.message()
                );
                self.mutate(|s| s.append_message(Sender::Assistant, message, None));
            }
        }
    }

    async fn recognize(&self, clip: &[u8], mime_type: &str) -> Result<Option<String>> {
        let provider = self
            .inner
            .providers
            .transcription
            .clone()
            .ok_or_else(|| AgentError::Config(TRANSCRIPTION_KEY_MISSING.into()))?;
        let data_url = to_data_url(mime_type, clip);
        provider.transcribe(data_url_payload(&data_url)).await
    }
}
