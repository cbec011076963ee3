//! The agent's single mutable aggregate and its persisted snapshot.
//!
//! [`AgentState`] owns everything the agent mutates: threads, status,
//! preferences, reminders and suggestions. It is pure data; the
//! [`crate::agent::Agent`] handle serializes access to it and persists a
//! [`SessionSnapshot`] after every change.

use serde::{Deserialize, Serialize};

use crate::model::{
    AgentStatus, DisplayContent, DisplayKind, DisplayMode, FileAttachment, IdClock, Reminder,
    Sender, Thread, ThreadId,
};
use crate::threads::ThreadRepository;

/// Pane title used when listing reminders.
pub const REMINDERS_TITLE: &str = "Active Reminders";

/// Tracks whether the voice-mode announcement was made.
///
/// One announcement per preference session: it fires at most once until the
/// cloud-voice preference is toggled, which re-arms it.
#[derive(Debug, Clone, Default)]
pub struct AnnouncementGuard {
    announced: bool,
}

impl AnnouncementGuard {
    /// Claim the announcement. Returns `true` only for the first caller.
    pub fn claim(&mut self) -> bool {
        !std::mem::replace(&mut self.announced, true)
    }

    /// Allow the next announcement.
    pub fn rearm(&mut self) {
        self.announced = false;
    }

    /// Whether the announcement was already made.
    pub fn is_spent(&self) -> bool {
        self.announced
    }
}

/// What survives a restart.
///
/// Missing fields default, and the camelCase field names of older snapshots
/// are accepted. Reminders, status and suggestions are deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSnapshot {
    pub threads: Vec<Thread>,
    #[serde(alias = "activeThreadId")]
    pub active_thread_id: Option<ThreadId>,
    #[serde(alias = "displayMode")]
    pub display_mode: DisplayMode,
    #[serde(alias = "isMuted")]
    pub muted: bool,
    #[serde(alias = "useGoogleTTS")]
    pub use_cloud_voice: bool,
    #[serde(alias = "useGoogleSTT")]
    pub use_cloud_transcription: bool,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            threads: Vec::new(),
            active_thread_id: None,
            display_mode: DisplayMode::default(),
            muted: false,
            use_cloud_voice: true,
            use_cloud_transcription: false,
        }
    }
}

/// The agent's complete mutable state.
#[derive(Debug, Clone)]
pub struct AgentState {
    threads: ThreadRepository,
    status: AgentStatus,
    reminders: Vec<Reminder>,
    reminder_ids: IdClock,
    suggested_questions: Vec<String>,
    /// Bumped on every user message; stale suggestion lists compare against it.
    user_turn: u64,
    muted: bool,
    use_cloud_voice: bool,
    use_cloud_transcription: bool,
    display_mode: DisplayMode,
    announcement: AnnouncementGuard,
}

impl Default for AgentState {
    fn default() -> Self {
        Self::from_snapshot(SessionSnapshot::default())
    }
}

impl AgentState {
    /// Rebuild state from a snapshot, healing an empty or dangling selection.
    pub fn from_snapshot(snapshot: SessionSnapshot) -> Self {
        Self {
            threads: ThreadRepository::restore(snapshot.threads, snapshot.active_thread_id),
            status: AgentStatus::Idle,
            reminders: Vec::new(),
            reminder_ids: IdClock::default(),
            suggested_questions: Vec::new(),
            user_turn: 0,
            muted: snapshot.muted,
            use_cloud_voice: snapshot.use_cloud_voice,
            use_cloud_transcription: snapshot.use_cloud_transcription,
            display_mode: snapshot.display_mode,
            announcement: AnnouncementGuard::default(),
        }
    }

    /// The persisted view of this state.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            threads: self.threads.threads().to_vec(),
            active_thread_id: self.threads.active_id(),
            display_mode: self.display_mode,
            muted: self.muted,
            use_cloud_voice: self.use_cloud_voice,
            use_cloud_transcription: self.use_cloud_transcription,
        }
    }

    // --- threads ---

    /// Read access to the thread repository.
    pub fn threads(&self) -> &ThreadRepository {
        &self.threads
    }

    /// The active thread.
    pub fn active_thread(&self) -> Option<&Thread> {
        self.threads.active()
    }

    /// Active thread id.
    pub fn active_thread_id(&self) -> Option<ThreadId> {
        self.threads.active_id()
    }

    /// Whether `thread` is the active thread.
    pub fn is_active(&self, thread: ThreadId) -> bool {
        self.threads.active_id() == Some(thread)
    }

    pub fn create_thread(&mut self) -> ThreadId {
        self.suggested_questions.clear();
        self.threads.create_thread()
    }

    /// Select a thread; unknown ids are ignored. Clears suggestions on success.
    pub fn select_thread(&mut self, id: ThreadId) -> bool {
        let switched = self.threads.select_thread(id);
        if switched {
            self.suggested_questions.clear();
        }
        switched
    }

    pub fn delete_thread(&mut self, id: ThreadId) -> bool {
        let was_active = self.is_active(id);
        let removed = self.threads.delete_thread(id);
        if was_active {
            self.suggested_questions.clear();
        }
        removed
    }

    pub fn rename_thread(&mut self, id: ThreadId, title: &str) -> bool {
        self.threads.rename_thread(id, title)
    }

    pub fn clear_all(&mut self) -> ThreadId {
        self.suggested_questions.clear();
        self.threads.clear_all()
    }

    /// Append to the active thread. Always clears suggestions.
    pub fn append_message(
        &mut self,
        from: Sender,
        text: impl Into<String>,
        file: Option<FileAttachment>,
    ) -> Option<u64> {
        self.note_append(from);
        self.threads.append_message(from, text, file)
    }

    /// Append to a specific thread. Always clears suggestions.
    pub fn append_message_to(
        &mut self,
        thread: ThreadId,
        from: Sender,
        text: impl Into<String>,
        file: Option<FileAttachment>,
    ) -> Option<u64> {
        self.note_append(from);
        self.threads.append_message_to(thread, from, text, file)
    }

    /// Append an assistant notice to `thread`, falling back to the active
    /// thread when it is gone. Suggestions are left as they are.
    pub fn append_notice_to(&mut self, thread: ThreadId, text: impl Into<String>) -> Option<u64> {
        let target = if self.threads.contains(thread) {
            thread
        } else {
            self.threads.active_id()?
        };
        self.threads.append_message_to(target, Sender::Assistant, text, None)
    }

    fn note_append(&mut self, from: Sender) {
        self.suggested_questions.clear();
        if from == Sender::User {
            self.user_turn += 1;
        }
    }

    /// Counter of user messages seen so far.
    pub fn user_turn(&self) -> u64 {
        self.user_turn
    }

    /// Attach a file to the active thread.
    pub fn attach_file(&mut self, file: FileAttachment) -> bool {
        match self.threads.active_mut() {
            Some(thread) => {
                thread.active_file = Some(file);
                true
            }
            None => false,
        }
    }

    /// Drop the active thread's file. Returns whether one was attached.
    pub fn clear_active_file(&mut self) -> bool {
        self.threads
            .active_mut()
            .and_then(|thread| thread.active_file.take())
            .is_some()
    }

    /// Replace a thread's focus pane.
    pub fn set_display(&mut self, thread: ThreadId, content: DisplayContent) -> bool {
        match self.threads.get_mut(thread) {
            Some(t) => {
                t.display_content = content;
                true
            }
            None => false,
        }
    }

    /// Apply the answer pane policy to `thread`.
    ///
    /// A pane still showing its placeholder, or a thread without a title,
    /// is replaced; otherwise the answer is appended below a rule. An
    /// untitled thread takes its title from `prompt`. A title the user
    /// chose is kept.
    pub fn record_answer(&mut self, thread: ThreadId, prompt: &str, response: &str) -> bool {
        let Some(t) = self.threads.get_mut(thread) else {
            return false;
        };
        let section = format!("## {prompt}\n\n{response}");
        if t.display_content.is_placeholder() || !t.titled {
            t.display_content = DisplayContent::markdown(format!("Thread: {prompt}"), section);
        } else {
            t.display_content.content.push_str("\n\n---\n\n");
            t.display_content.content.push_str(&section);
        }
        if !t.titled {
            t.title = derive_title(prompt);
            t.titled = true;
        }
        true
    }

    // --- reminders ---

    /// Store a reminder and show the reminder list in the active pane.
    pub fn add_reminder(&mut self, text: impl Into<String>) -> &Reminder {
        let reminder = Reminder {
            id: self.reminder_ids.next(),
            text: text.into(),
            created_at: chrono::Utc::now(),
        };
        self.reminders.push(reminder);
        let listing = self
            .reminders
            .iter()
            .map(|r| format!("- {}", r.text))
            .collect::<Vec<_>>()
            .join("\n");
        if let Some(active) = self.threads.active_mut() {
            active.display_content = DisplayContent {
                title: REMINDERS_TITLE.to_owned(),
                content: listing,
                kind: DisplayKind::Reminders,
            };
        }
        &self.reminders[self.reminders.len() - 1]
    }

    pub fn reminders(&self) -> &[Reminder] {
        &self.reminders
    }

    // --- suggestions ---

    pub fn suggested_questions(&self) -> &[String] {
        &self.suggested_questions
    }

    /// Replace the suggestion list.
    pub fn set_suggested_questions(&mut self, questions: Vec<String>) {
        self.suggested_questions = questions;
    }

    // --- status ---

    pub fn status(&self) -> AgentStatus {
        self.status
    }

    pub fn set_status(&mut self, status: AgentStatus) {
        self.status = status;
    }

    // --- preferences ---

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Flip the mute flag and return the new value.
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }

    pub fn use_cloud_voice(&self) -> bool {
        self.use_cloud_voice
    }

    /// Flip the cloud-voice preference and re-arm the announcement.
    pub fn toggle_cloud_voice(&mut self) -> bool {
        self.use_cloud_voice = !self.use_cloud_voice;
        self.announcement.rearm();
        self.use_cloud_voice
    }

    pub fn use_cloud_transcription(&self) -> bool {
        self.use_cloud_transcription
    }

    pub fn toggle_cloud_transcription(&mut self) -> bool {
        self.use_cloud_transcription = !self.use_cloud_transcription;
        self.use_cloud_transcription
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        self.display_mode = mode;
    }

    pub fn announcement(&self) -> &AnnouncementGuard {
        &self.announcement
    }

    pub fn announcement_mut(&mut self) -> &mut AnnouncementGuard {
        &mut self.announcement
    }
}

/// Thread title derived from a prompt: over 25 chars becomes 22 chars + `...`.
pub fn derive_title(prompt: &str) -> String {
    if prompt.chars().count() > 25 {
        let head: String = prompt.chars().take(22).collect();
        format!("{head}...")
    } else {
        prompt.to_owned()
    }
}
