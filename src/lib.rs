//! Friday: a conversational assistant engine.
//!
//! The engine keeps a set of conversation threads, routes each line of
//! user input either to a local command (site search, reminders, the
//! time) or to a Gemini model, and voices replies through a premium
//! cloud voice with an on-device fallback.
//!
//! # Architecture
//!
//! - **State**: [`threads`] and [`state`] hold the conversations, the
//!   display pane and preferences; a [`store::KeyValueStore`] checkpoints
//!   them after every change.
//! - **Routing**: [`commands`] recognizes local commands; everything else
//!   becomes a model prompt.
//! - **Providers**: [`providers`] wraps Gemini generation, Cloud
//!   Text-to-Speech and Cloud Speech-to-Text behind traits.
//! - **Host**: [`host`] abstracts what the embedding shell provides
//!   (on-device speech, audio playback, opening URLs).
//! - **Agent**: [`agent::Agent`] ties it together.

pub mod agent;
pub mod commands;
pub mod config;
pub mod encoding;
pub mod error;
pub mod host;
pub mod model;
pub mod providers;
pub mod speech_text;
pub mod state;
pub mod store;
pub mod threads;

#[cfg(test)]
mod test_utils;

pub use agent::{Agent, AgentBuilder, Models};
pub use config::AgentConfig;
pub use error::{AgentError, Result};
pub use host::HostCapabilities;
pub use model::{AgentStatus, DisplayMode, Message, Sender, Thread, ThreadId};
pub use providers::Providers;
pub use state::AgentState;
