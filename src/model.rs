//! Core conversation types.
//!
//! These are the values that live inside the session snapshot. Field names
//! serialize in snake_case; the camelCase names written by earlier browser
//! builds are accepted as aliases so old snapshots still load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Title given to freshly created threads and their focus pane.
pub const WELCOME_TITLE: &str = "Welcome";

/// Placeholder shown in the focus pane of a fresh thread.
pub const PANE_PLACEHOLDER: &str = "Your requested information will appear here.";

/// Opaque thread identifier.
///
/// Time-derived (Unix milliseconds) but forced strictly increasing by
/// [`IdClock`], so it stays unique even for same-millisecond creations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub u64);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    /// Lowercase label used in transcripts.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A file attached to a prompt.
///
/// Built once from raw bytes at upload time and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttachment {
    /// Original file name.
    pub name: String,
    /// MIME type, e.g. `image/png`.
    #[serde(alias = "type")]
    pub mime_type: String,
    /// `data:` URL used for previews.
    #[serde(alias = "previewUrl")]
    pub preview_url: String,
    /// Raw base64 payload sent to the generation API.
    pub base64: String,
}

impl FileAttachment {
    /// Encode raw file bytes into an attachment.
    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        let mime_type = mime_type.into();
        let preview_url = crate::encoding::to_data_url(&mime_type, bytes);
        let base64 = crate::encoding::data_url_payload(&preview_url).to_owned();
        Self {
            name: name.into(),
            mime_type,
            preview_url,
            base64,
        }
    }

    /// The major part of the MIME type (`image` for `image/png`).
    pub fn major_type(&self) -> &str {
        self.mime_type
            .split('/')
            .next()
            .filter(|major| !major.is_empty())
            .unwrap_or("file")
    }
}

/// One entry in a thread's conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Zero when an old snapshot omitted it; reissued on restore.
    #[serde(default)]
    pub id: u64,
    pub from: Sender,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileAttachment>,
}

/// How the focus pane content should be rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayKind {
    #[default]
    Markdown,
    Reminders,
}

/// The focus pane of a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayContent {
    pub title: String,
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: DisplayKind,
}

impl DisplayContent {
    /// Markdown pane.
    pub fn markdown(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            kind: DisplayKind::Markdown,
        }
    }

    /// The pane every new thread starts with.
    pub fn placeholder() -> Self {
        Self::markdown(WELCOME_TITLE, PANE_PLACEHOLDER)
    }

    /// Whether the pane still shows its initial placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.title == WELCOME_TITLE && self.kind == DisplayKind::Markdown
    }
}

impl Default for DisplayContent {
    fn default() -> Self {
        Self::placeholder()
    }
}

/// One independent conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    #[serde(default = "welcome_title")]
    pub title: String,
    #[serde(default)]
    pub conversation: Vec<Message>,
    #[serde(default, alias = "displayContent")]
    pub display_content: DisplayContent,
    #[serde(default, alias = "activeFile")]
    pub active_file: Option<FileAttachment>,
    /// Set once the title was derived from a prompt or chosen by the user.
    #[serde(default)]
    pub titled: bool,
}

fn welcome_title() -> String {
    WELCOME_TITLE.to_owned()
}

/// A reminder created with the reminder command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: u64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// What the agent is currently doing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Idle,
    /// Waiting on a model or transcription response.
    Thinking,
    /// The host is recording speech input.
    Listening,
}

/// How the host should present the focus pane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Rendered,
    Raw,
}

/// Issues time-derived ids that never repeat within a process.
#[derive(Debug, Clone, Default)]
pub struct IdClock {
    last: u64,
}

impl IdClock {
    /// Start after `floor`, typically the largest id already in use.
    pub fn starting_after(floor: u64) -> Self {
        Self { last: floor }
    }

    /// Next id: current Unix milliseconds, bumped past the previous id.
    pub fn next(&mut self) -> u64 {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        self.last = now.max(self.last.saturating_add(1));
        self.last
    }
}
