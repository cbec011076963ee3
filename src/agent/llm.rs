//! Language-model orchestration: answers, summaries, follow-up suggestions
//! and file uploads.
//!
//! Every call is tagged with the thread it was made for. Results land in
//! that thread if it still exists; speech and suggestions only follow when
//! the thread is still the active one.

use tracing::{debug, warn};

use super::{Agent, IdleOnDrop};
use crate::error::{AgentError, Result};
use crate::model::{AgentStatus, DisplayContent, FileAttachment, Sender, ThreadId};
use crate::providers::GenerationRequest;

const NO_RESPONSE: &str = "I couldn't generate a response.";
const GENERATION_KEY_MISSING: &str = "API key is missing. Set FRIDAY_GEMINI_API_KEY or \
     `api_key` under [generation] in config.toml.";
const SUMMARY_TITLE: &str = "Conversation Summary";
const SUMMARY_SPOKEN: &str = "Here is a summary of our conversation.";
const NO_SUMMARY: &str = "Could not generate a summary.";
const MAX_SUGGESTIONS: usize = 3;

/// Prompt asking for three follow-up questions about `response`.
pub fn suggestion_prompt(response: &str) -> String {
    format!(
        "Based on the following text, suggest exactly three concise and relevant \
         follow-up questions. Output them as a JSON array of strings, like this: \
         [\"Question 1?\", \"Question 2?\", \"Question 3?\"]\n\nText: \"{response}\""
    )
}

/// Prompt asking for a bullet-point summary of a rendered transcript.
pub fn summary_prompt(transcript: &str) -> String {
    format!(
        "Please provide a concise, bullet-point summary of the following \
         conversation:\n\n---\n\n{transcript}"
    )
}

/// Parse the bracketed list in a suggestion reply.
///
/// Takes the span from the first `[` to the last `]`, parses it as a JSON
/// array and keeps at most three strings. Anything unparsable yields an
/// empty list.
pub fn parse_suggestions(reply: &str) -> Vec<String> {
    let (Some(start), Some(end)) = (reply.find('['), reply.rfind(']')) else {
        return Vec::new();
    };
    if end < start {
        return Vec::new();
    }
    serde_json::from_str::<Vec<serde_json::Value>>(&reply[start..=end])
        .map(|values| {
            values
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .take(MAX_SUGGESTIONS)
                .collect()
        })
        .unwrap_or_default()
}

impl Agent {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        file: Option<&FileAttachment>,
    ) -> Result<Option<String>> {
        let provider = self
            .inner
            .providers
            .generation
            .clone()
            .ok_or_else(|| AgentError::Config(GENERATION_KEY_MISSING.into()))?;
        provider
            .generate(GenerationRequest {
                model,
                prompt,
                file,
            })
            .await
    }

    /// Ask the model about `prompt` in the active thread.
    pub async fn ask(&self, prompt: &str, file: Option<FileAttachment>) {
        let Some(thread) = self.with_state(|s| s.active_thread_id()) else {
            return;
        };
        self.ask_in(thread, prompt, file).await;
    }

    pub(super) async fn ask_in(&self, thread: ThreadId, prompt: &str, file: Option<FileAttachment>) {
        self.set_status(AgentStatus::Thinking);
        let _idle = IdleOnDrop::new(self);
        let turn = self.with_state(|s| s.user_turn());
        let model = self.inner.models.answer.clone();

        let response = match self.generate(&model, prompt, file.as_ref()).await {
            Ok(text) => text.unwrap_or_else(|| NO_RESPONSE.to_owned()),
            Err(e) => {
                warn!(%thread, "generation failed: {e}");
                let message = format!("Sorry, I encountered an error. {}", e.message());
                self.mutate(|s| s.append_message_to(thread, Sender::Assistant, message, None));
                return;
            }
        };

        let still_active = self.mutate(|s| {
            s.append_message_to(thread, Sender::Assistant, response.clone(), None)?;
            s.record_answer(thread, prompt, &response);
            Some(s.is_active(thread))
        });
        match still_active {
            None => debug!(%thread, "thread deleted before the answer arrived"),
            Some(false) => debug!(%thread, "answer landed in a background thread"),
            Some(true) => {
                self.spawn_speech(thread, response.clone());
                self.spawn_suggestions(thread, turn, response);
            }
        }
    }

    fn spawn_suggestions(&self, thread: ThreadId, turn: u64, response: String) {
        if self.inner.providers.generation.is_none() {
            return;
        }
        let agent = self.clone();
        self.spawn(async move {
            let model = agent.inner.models.utility.clone();
            let questions = match agent.generate(&model, &suggestion_prompt(&response), None).await {
                Ok(reply) => parse_suggestions(reply.as_deref().unwrap_or("[]")),
                Err(e) => {
                    debug!("suggestion request failed: {e}");
                    Vec::new()
                }
            };
            agent.update_transient(|s| {
                if s.is_active(thread) && s.user_turn() == turn {
                    s.set_suggested_questions(questions);
                } else {
                    debug!(%thread, "dropping stale suggestions");
                }
            });
        });
    }

    /// Summarize the active thread into its focus pane.
    ///
    /// Does nothing for a thread with at most one message.
    pub async fn summarize(&self) {
        let Some((thread, transcript)) = self.with_state(|s| {
            let t = s.active_thread()?;
            if t.conversation.len() <= 1 {
                return None;
            }
            let transcript = t
                .conversation
                .iter()
                .map(|m| format!("{}: {}", m.from.as_str(), m.text))
                .collect::<Vec<_>>()
                .join("\n\n");
            Some((t.id, transcript))
        }) else {
            return;
        };

        self.set_status(AgentStatus::Thinking);
        let _idle = IdleOnDrop::new(self);
        let model = self.inner.models.utility.clone();

        match self.generate(&model, &summary_prompt(&transcript), None).await {
            Ok(summary) => {
                let summary = summary.unwrap_or_else(|| NO_SUMMARY.to_owned());
                let speak = self.mutate(|s| {
                    s.set_display(thread, DisplayContent::markdown(SUMMARY_TITLE, summary))
                        && s.is_active(thread)
                });
                if speak {
                    self.spawn_speech(thread, SUMMARY_SPOKEN.to_owned());
                }
            }
            Err(e) => {
                warn!(%thread, "summary failed: {e}");
                let content = format!("{NO_SUMMARY} {}", e.message());
                self.mutate(|s| s.set_display(thread, DisplayContent::markdown("Error", content)));
            }
        }
    }

    /// Attach a file to the active thread and ask about it.
    ///
    /// A blank prompt becomes `What should I know about this <type>?`.
    pub async fn handle_file_upload(&self, name: &str, mime_type: &str, bytes: &[u8], prompt: &str) {
        self.set_status(AgentStatus::Thinking);
        let _idle = IdleOnDrop::new(self);

        let file = FileAttachment::from_bytes(name, mime_type, bytes);
        let prompt = match prompt.trim() {
            "" => format!("What should I know about this {}?", file.major_type()),
            p => p.to_owned(),
        };
        let Some(thread) = self.mutate(|s| {
            let thread = s.active_thread_id()?;
            s.attach_file(file.clone());
            s.append_message(Sender::User, prompt.clone(), Some(file.clone()));
            Some(thread)
        }) else {
            return;
        };
        debug!(%thread, file = name, mime_type, "file attached");
        self.ask_in(thread, &prompt, Some(file)).await;
    }
}
