//! Shared fakes for the agent's unit tests.
//!
//! `FakeHost` records what the agent asked the host to do; the provider
//! fakes return canned results and can be gated to simulate slow services.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::agent::Agent;
use crate::error::{AgentError, Result};
use crate::host::{AudioClip, AudioOutput, HostCapabilities, Navigator, OnDeviceSpeech, Playback};
use crate::model::Sender;
use crate::providers::{
    GenerationProvider, GenerationRequest, SynthesisProvider, TranscriptionProvider,
};

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Assistant message texts of the active thread, oldest first.
pub fn assistant_texts(agent: &Agent) -> Vec<String> {
    agent.with_state(|s| {
        s.active_thread()
            .map(|t| {
                t.conversation
                    .iter()
                    .filter(|m| m.from == Sender::Assistant)
                    .map(|m| m.text.clone())
                    .collect()
            })
            .unwrap_or_default()
    })
}

// --- host ---

#[derive(Default)]
struct HostLog {
    spoken: Mutex<Vec<String>>,
    opened: Mutex<Vec<String>>,
    plays_started: AtomicUsize,
    live: Arc<AtomicUsize>,
    ended: Arc<AtomicBool>,
}

/// Recording host.
#[derive(Clone, Default)]
pub struct FakeHost {
    log: Arc<HostLog>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capabilities(&self) -> HostCapabilities {
        HostCapabilities::new(
            Arc::new(self.clone()),
            Arc::new(self.clone()),
            Arc::new(self.clone()),
        )
    }

    /// Utterances sent to the on-device voice.
    pub fn spoken(&self) -> Vec<String> {
        lock(&self.log.spoken).clone()
    }

    pub fn opened_urls(&self) -> Vec<String> {
        lock(&self.log.opened).clone()
    }

    pub fn plays_started(&self) -> usize {
        self.log.plays_started.load(Ordering::SeqCst)
    }

    /// Let every started playback reach its end.
    pub fn finish_playbacks(&self) {
        self.log.ended.store(true, Ordering::SeqCst);
    }

    /// Playbacks started and not yet stopped.
    pub fn live_playbacks(&self) -> usize {
        self.log.live.load(Ordering::SeqCst)
    }
}

impl OnDeviceSpeech for FakeHost {
    fn speak(&self, text: &str) {
        lock(&self.log.spoken).push(text.to_owned());
    }

    fn cancel(&self) {}
}

impl AudioOutput for FakeHost {
    fn play(&self, _clip: AudioClip) -> Result<Box<dyn Playback>> {
        self.log.plays_started.fetch_add(1, Ordering::SeqCst);
        self.log.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePlayback {
            live: Arc::clone(&self.log.live),
            ended: Arc::clone(&self.log.ended),
            stopped: false,
        }))
    }
}

impl Navigator for FakeHost {
    fn open_url(&self, url: &str) -> Result<()> {
        lock(&self.log.opened).push(url.to_owned());
        Ok(())
    }
}

struct FakePlayback {
    live: Arc<AtomicUsize>,
    ended: Arc<AtomicBool>,
    stopped: bool,
}

impl Playback for FakePlayback {
    fn stop(&mut self) {
        if !std::mem::replace(&mut self.stopped, true) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn is_finished(&mut self) -> bool {
        self.stopped || self.ended.load(Ordering::SeqCst)
    }
}

// --- gating ---

/// Holds requests until released.
struct Gate {
    enabled: bool,
    permits: Semaphore,
    released: AtomicBool,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            enabled: false,
            permits: Semaphore::new(0),
            released: AtomicBool::new(false),
        }
    }
}

impl Gate {
    fn closed() -> Self {
        Self {
            enabled: true,
            permits: Semaphore::new(0),
            released: AtomicBool::new(false),
        }
    }

    async fn pass(&self) {
        if self.enabled && !self.released.load(Ordering::SeqCst) {
            if let Ok(permit) = self.permits.acquire().await {
                permit.forget();
            }
        }
    }

    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
        self.permits.add_permits(Semaphore::MAX_PERMITS / 2);
    }
}

async fn wait_until(mut ready: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if ready() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

// --- generation ---

/// A recorded generation call.
#[derive(Debug, Clone)]
pub struct RecordedPrompt {
    pub model: String,
    pub prompt: String,
    pub file_mime: Option<String>,
}

/// Canned generation replies, optionally per model.
pub struct FakeGeneration {
    default_reply: Option<String>,
    per_model: HashMap<String, String>,
    prompts: Mutex<Vec<RecordedPrompt>>,
    gate: Gate,
}

impl FakeGeneration {
    fn build(reply: Option<&str>, gate: Gate) -> Self {
        Self {
            default_reply: reply.map(str::to_owned),
            per_model: HashMap::new(),
            prompts: Mutex::new(Vec::new()),
            gate,
        }
    }

    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self::build(Some(reply), Gate::default()))
    }

    /// Responds without any candidate text.
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::build(None, Gate::default()))
    }

    /// Replies only after [`FakeGeneration::release`].
    pub fn gated(reply: &str) -> Arc<Self> {
        Arc::new(Self::build(Some(reply), Gate::closed()))
    }

    /// Use `reply` for calls to `model`.
    pub fn with_reply_for(self: Arc<Self>, model: &str, reply: &str) -> Arc<Self> {
        let mut this = Arc::try_unwrap(self).unwrap_or_else(|_| panic!("configure before sharing"));
        this.per_model.insert(model.to_owned(), reply.to_owned());
        Arc::new(this)
    }

    pub fn prompts(&self) -> Vec<RecordedPrompt> {
        lock(&self.prompts).clone()
    }

    pub async fn wait_for_requests(&self, n: usize) {
        wait_until(|| lock(&self.prompts).len() >= n).await;
    }

    pub fn release(&self) {
        self.gate.release();
    }
}

#[async_trait]
impl GenerationProvider for FakeGeneration {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<Option<String>> {
        lock(&self.prompts).push(RecordedPrompt {
            model: request.model.to_owned(),
            prompt: request.prompt.to_owned(),
            file_mime: request.file.map(|f| f.mime_type.clone()),
        });
        self.gate.pass().await;
        Ok(self
            .per_model
            .get(request.model)
            .cloned()
            .or_else(|| self.default_reply.clone()))
    }
}

// --- synthesis ---

pub struct FakeSynthesis {
    fail: bool,
    requests: Mutex<Vec<String>>,
    gate: Gate,
}

impl FakeSynthesis {
    fn build(fail: bool, gate: Gate) -> Arc<Self> {
        Arc::new(Self {
            fail,
            requests: Mutex::new(Vec::new()),
            gate,
        })
    }

    pub fn ok() -> Arc<Self> {
        Self::build(false, Gate::default())
    }

    pub fn failing() -> Arc<Self> {
        Self::build(true, Gate::default())
    }

    pub fn gated() -> Arc<Self> {
        Self::build(false, Gate::closed())
    }

    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }

    pub async fn wait_for_requests(&self, n: usize) {
        wait_until(|| lock(&self.requests).len() >= n).await;
    }

    pub fn release(&self) {
        self.gate.release();
    }
}

#[async_trait]
impl SynthesisProvider for FakeSynthesis {
    async fn synthesize(&self, text: &str) -> Result<AudioClip> {
        lock(&self.requests).push(text.to_owned());
        self.gate.pass().await;
        if self.fail {
            return Err(AgentError::Transport("synthesis unavailable".into()));
        }
        Ok(AudioClip {
            mime_type: "audio/mpeg".into(),
            bytes: vec![0xff, 0xfb],
        })
    }
}

// --- transcription ---

pub struct FakeTranscription {
    transcript: Option<String>,
    requests: Mutex<Vec<String>>,
}

impl FakeTranscription {
    pub fn returning(transcript: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            transcript: transcript.map(str::to_owned),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Base64 payloads received.
    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl TranscriptionProvider for FakeTranscription {
    async fn transcribe(&self, audio_base64: &str) -> Result<Option<String>> {
        lock(&self.requests).push(audio_base64.to_owned());
        Ok(self.transcript.clone())
    }
}
