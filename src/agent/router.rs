//! User input routing: local commands first, the language model otherwise.

use tracing::{debug, warn};

use super::Agent;
use crate::commands::{self, Command};
use crate::model::{AgentStatus, Sender};

const REMINDER_PROMPT: &str =
    "What would you like me to be reminded about? Try \"set a reminder to call mom\".";

/// Local time as `h:mm:ss AM/PM`.
fn local_time() -> String {
    chrono::Local::now().format("%-I:%M:%S %p").to_string()
}

impl Agent {
    /// Handle one line of user input.
    ///
    /// The text is appended as a user message and any audio is stopped
    /// before routing. Local commands finish synchronously; prompts go to
    /// the language model with the active thread's file attached.
    pub async fn handle_user_input(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let Some((thread, file)) = self.mutate(|s| {
            let thread = s.active_thread()?;
            let context = (thread.id, thread.active_file.clone());
            s.append_message(Sender::User, text, None);
            Some(context)
        }) else {
            return;
        };
        self.stop_audio();

        let command = commands::parse(text);
        debug!(?command, %thread, "routing user input");
        match command {
            Command::Search { site, query, url } => {
                self.set_status(AgentStatus::Thinking);
                self.say(thread, format!("Searching {} for \"{query}\"...", site.name));
                if let Err(e) = self.inner.host.navigator.open_url(&url) {
                    warn!("could not open search results: {e}");
                }
                self.set_status(AgentStatus::Idle);
            }
            Command::MissingSearchQuery { site } => {
                let message = format!("Please provide a search term after /{}", site.name);
                self.mutate(|s| s.append_message_to(thread, Sender::Assistant, message, None));
            }
            Command::Reminder { text } => {
                self.set_status(AgentStatus::Thinking);
                self.mutate(|s| {
                    s.add_reminder(text.clone());
                });
                self.say(thread, format!("Reminder set: \"{text}\""));
                self.set_status(AgentStatus::Idle);
            }
            Command::EmptyReminder => {
                self.say(thread, REMINDER_PROMPT.to_owned());
            }
            Command::TimeQuery => {
                self.set_status(AgentStatus::Thinking);
                self.say(thread, format!("The current time is {}.", local_time()));
                self.set_status(AgentStatus::Idle);
            }
            Command::Ask(prompt) => {
                self.ask_in(thread, &prompt, file).await;
            }
        }
    }
}
