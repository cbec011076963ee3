//! The agent handle.
//!
//! [`Agent`] is a cheap, cloneable handle over one [`AgentState`] plus the
//! services and host capabilities it drives. Every mutation goes through
//! [`Agent::mutate`], which checkpoints the session snapshot to the store
//! before the state lock is released. The lock is a plain
//! `std::sync::Mutex` and is never held across an `.await`.
//!
//! Follow-up work that must not block the caller (speech, follow-up
//! suggestions) is spawned on an internal [`TaskTracker`];
//! [`Agent::drain_background`] waits for it.

mod llm;
mod router;
mod speech;

use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::host::HostCapabilities;
use crate::model::{AgentStatus, DisplayMode, Sender, ThreadId};
use crate::providers::Providers;
use crate::state::{AgentState, SessionSnapshot};
use crate::store::KeyValueStore;

pub use llm::{parse_suggestions, suggestion_prompt, summary_prompt};
pub use speech::{FALLBACK_ANNOUNCEMENT, NO_CLOUD_VOICE_ANNOUNCEMENT, PREMIUM_ANNOUNCEMENT};

/// Emitted when the active thread's file context is dropped.
pub const FILE_CLEARED: &str = "File context has been cleared.";

/// Model names used for the two kinds of generation calls.
#[derive(Debug, Clone)]
pub struct Models {
    /// Answers to user prompts.
    pub answer: String,
    /// Summaries and follow-up suggestions.
    pub utility: String,
}

impl Default for Models {
    fn default() -> Self {
        let defaults = crate::config::GenerationConfig::default();
        Self {
            answer: defaults.model,
            utility: defaults.utility_model,
        }
    }
}

/// Builder for [`Agent`].
pub struct AgentBuilder {
    host: HostCapabilities,
    store: Arc<dyn KeyValueStore>,
    providers: Providers,
    models: Models,
    session_key: String,
}

impl AgentBuilder {
    pub fn providers(mut self, providers: Providers) -> Self {
        self.providers = providers;
        self
    }

    pub fn models(mut self, models: Models) -> Self {
        self.models = models;
        self
    }

    /// Store key of the session snapshot (default `friday-threads`).
    pub fn session_key(mut self, key: impl Into<String>) -> Self {
        self.session_key = key.into();
        self
    }

    /// Load the saved session and build the agent.
    ///
    /// An unreadable or corrupt snapshot is logged, copied aside through
    /// [`KeyValueStore::preserve`], and replaced by a fresh session; it never
    /// fails the build. The stored value is left untouched until the first
    /// mutation.
    pub fn build(self) -> Agent {
        let loaded = load_snapshot(self.store.as_ref(), &self.session_key);
        let readable = loaded.is_some();
        let state = AgentState::from_snapshot(loaded.unwrap_or_default());
        info!(
            threads = state.threads().len(),
            providers = ?self.providers,
            "agent ready"
        );
        let agent = Agent {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                providers: self.providers,
                host: self.host,
                store: self.store,
                session_key: self.session_key,
                models: self.models,
                tasks: TaskTracker::new(),
                speech: speech::SpeechOutput::default(),
            }),
        };
        // A healed snapshot (no threads, dangling selection) is written back.
        if readable {
            agent.mutate(|_| ());
        }
        agent
    }
}

// `None` when a stored session exists but could not be read.
fn load_snapshot(store: &dyn KeyValueStore, key: &str) -> Option<SessionSnapshot> {
    let err = match store.get(key) {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(snapshot) => return Some(snapshot),
            Err(e) => e.to_string(),
        },
        Ok(None) => {
            debug!("no saved session under {key}");
            return Some(SessionSnapshot::default());
        }
        Err(e) => e.to_string(),
    };
    warn!("could not load saved session, starting fresh: {err}");
    if let Err(e) = store.preserve(key) {
        warn!("could not keep a copy of the unreadable session: {e}");
    }
    None
}

struct Inner {
    state: Mutex<AgentState>,
    providers: Providers,
    host: HostCapabilities,
    store: Arc<dyn KeyValueStore>,
    session_key: String,
    models: Models,
    tasks: TaskTracker,
    speech: speech::SpeechOutput,
}

/// Handle to the conversational agent.
#[derive(Clone)]
pub struct Agent {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("providers", &self.inner.providers)
            .field("session_key", &self.inner.session_key)
            .finish_non_exhaustive()
    }
}

/// Restores `idle` when an async entry point finishes, however it exits.
struct IdleOnDrop<'a> {
    agent: &'a Agent,
}

impl<'a> IdleOnDrop<'a> {
    fn new(agent: &'a Agent) -> Self {
        Self { agent }
    }
}

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.agent.set_status(AgentStatus::Idle);
    }
}

impl Agent {
    /// Start building an agent around a host and a snapshot store.
    pub fn builder(host: HostCapabilities, store: Arc<dyn KeyValueStore>) -> AgentBuilder {
        AgentBuilder {
            host,
            store,
            providers: Providers::default(),
            models: Models::default(),
            session_key: crate::config::StorageConfig::default().session_key,
        }
    }

    /// Build an agent with real HTTP providers from `config`.
    pub fn from_config(
        config: &AgentConfig,
        host: HostCapabilities,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self::builder(host, store)
            .providers(Providers::from_config(config))
            .models(Models {
                answer: config.generation.model.clone(),
                utility: config.generation.utility_model.clone(),
            })
            .session_key(config.storage.session_key.clone())
            .build()
    }

    fn lock_state(&self) -> MutexGuard<'_, AgentState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// Read the state.
    pub fn with_state<R>(&self, f: impl FnOnce(&AgentState) -> R) -> R {
        f(&self.lock_state())
    }

    /// A copy of the current state.
    pub fn state(&self) -> AgentState {
        self.lock_state().clone()
    }

    /// Mutate the state and checkpoint it.
    ///
    /// Storage failures are logged; the conversation carries on.
    pub(crate) fn mutate<R>(&self, f: impl FnOnce(&mut AgentState) -> R) -> R {
        let mut state = self.lock_state();
        let result = f(&mut state);
        self.persist(&state.snapshot());
        result
    }

    // Status and suggestions are not part of the snapshot.
    fn update_transient<R>(&self, f: impl FnOnce(&mut AgentState) -> R) -> R {
        f(&mut self.lock_state())
    }

    fn persist(&self, snapshot: &SessionSnapshot) {
        let value = match serde_json::to_value(snapshot) {
            Ok(value) => value,
            Err(e) => {
                warn!("could not serialize session: {e}");
                return;
            }
        };
        if let Err(e) = self.inner.store.set(&self.inner.session_key, &value) {
            warn!("could not save session: {e}");
        }
    }

    pub(crate) fn set_status(&self, status: AgentStatus) {
        self.update_transient(|s| s.set_status(status));
    }

    pub fn status(&self) -> AgentStatus {
        self.with_state(|s| s.status())
    }

    /// Wait for spawned speech and suggestion tasks to finish.
    pub async fn drain_background(&self) {
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        self.inner.tasks.reopen();
    }

    fn spawn<F>(&self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.inner.tasks.spawn(task);
    }

    /// Append an assistant message to `thread` and speak it.
    fn say(&self, thread: ThreadId, message: String) {
        self.mutate(|s| s.append_message_to(thread, Sender::Assistant, message.clone(), None));
        self.spawn_speech(thread, message);
    }

    // --- thread operations ---

    /// Start a new conversation. Stops any audio.
    pub fn create_thread(&self) -> ThreadId {
        self.stop_audio();
        let id = self.mutate(|s| s.create_thread());
        debug!(%id, "thread created");
        id
    }

    /// Switch threads; unknown ids are ignored.
    pub fn select_thread(&self, id: ThreadId) -> bool {
        self.mutate(|s| s.select_thread(id))
    }

    pub fn delete_thread(&self, id: ThreadId) -> bool {
        let removed = self.mutate(|s| s.delete_thread(id));
        debug!(%id, removed, "thread deleted");
        removed
    }

    /// Rename a thread; blank titles are ignored.
    pub fn rename_thread(&self, id: ThreadId, title: &str) -> bool {
        self.mutate(|s| s.rename_thread(id, title))
    }

    /// Replace every thread with one fresh thread.
    pub fn clear_all(&self) -> ThreadId {
        self.mutate(|s| s.clear_all())
    }

    /// Drop the active thread's file context and say so.
    pub fn clear_active_file(&self) {
        self.mutate(|s| {
            if s.active_thread_id().is_some() {
                s.clear_active_file();
                s.append_message(Sender::Assistant, FILE_CLEARED, None);
            }
        });
    }

    // --- preferences ---

    /// Flip mute; muting stops audio. Returns the new value.
    pub fn toggle_mute(&self) -> bool {
        let muted = self.mutate(|s| s.toggle_mute());
        if muted {
            self.stop_audio();
        }
        muted
    }

    /// Flip the cloud-voice preference. The voice announcement re-arms.
    pub fn toggle_cloud_voice(&self) -> bool {
        self.mutate(|s| s.toggle_cloud_voice())
    }

    /// Flip the cloud-transcription preference.
    pub fn toggle_cloud_transcription(&self) -> bool {
        self.mutate(|s| s.toggle_cloud_transcription())
    }

    pub fn set_display_mode(&self, mode: DisplayMode) {
        self.mutate(|s| s.set_display_mode(mode));
    }

    /// The host started recording speech input.
    pub fn begin_listening(&self) {
        self.stop_audio();
        self.set_status(AgentStatus::Listening);
    }

    /// The host stopped recording without producing a clip.
    pub fn cancel_listening(&self) {
        self.update_transient(|s| {
            if s.status() == AgentStatus::Listening {
                s.set_status(AgentStatus::Idle);
            }
        });
    }
}
