//! Error types for the agent core.
//!
//! Each variant carries a stable error code (SCREAMING_SNAKE_CASE) that is
//! included in the Display output and accessible via [`AgentError::code()`].
//! None of these ever escape an agent entry point: they are turned into a
//! user-visible message, a silent fallback, or a log line at the call site.

/// Stable error codes for programmatic error handling.
pub mod error_codes {
    /// A service credential is not configured.
    pub const CONFIG_MISSING: &str = "CONFIG_MISSING";

    /// Non-success HTTP status or network failure.
    pub const TRANSPORT_FAILED: &str = "TRANSPORT_FAILED";

    /// The service answered with an unexpected shape.
    pub const MALFORMED_RESPONSE: &str = "MALFORMED_RESPONSE";

    /// Session snapshot could not be read or written.
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";

    /// A host capability (playback, navigation, file access) failed.
    pub const HOST_ERROR: &str = "HOST_ERROR";
}

/// Errors produced inside the agent core.
///
/// The Display impl formats as `[CODE] message`; use [`AgentError::message()`]
/// for text that is shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// A service credential is missing.
    #[error("[{}] {}", error_codes::CONFIG_MISSING, .0)]
    Config(String),

    /// Request failed in transit or with a non-success status.
    #[error("[{}] {}", error_codes::TRANSPORT_FAILED, .0)]
    Transport(String),

    /// Response parsed but did not have the expected shape.
    #[error("[{}] {}", error_codes::MALFORMED_RESPONSE, .0)]
    MalformedResponse(String),

    /// Snapshot persistence failure.
    #[error("[{}] {}", error_codes::STORAGE_ERROR, .0)]
    Storage(String),

    /// Host capability failure.
    #[error("[{}] {}", error_codes::HOST_ERROR, .0)]
    Host(String),
}

impl AgentError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => error_codes::CONFIG_MISSING,
            Self::Transport(_) => error_codes::TRANSPORT_FAILED,
            Self::MalformedResponse(_) => error_codes::MALFORMED_RESPONSE,
            Self::Storage(_) => error_codes::STORAGE_ERROR,
            Self::Host(_) => error_codes::HOST_ERROR,
        }
    }

    /// Returns the inner message without the code prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Config(m)
            | Self::Transport(m)
            | Self::MalformedResponse(m)
            | Self::Storage(m)
            | Self::Host(m) => m,
        }
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(format!("request failed: {e}"))
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AgentError>;
