//! Binary-to-text helpers for attachments and audio clips.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::{AgentError, Result};

/// Encode bytes as a `data:<mime>;base64,<payload>` URL.
pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

/// The base64 payload of a data URL (everything after the first comma).
///
/// Input without a comma is assumed to already be a bare payload.
pub fn data_url_payload(data_url: &str) -> &str {
    data_url
        .split_once(',')
        .map_or(data_url, |(_, payload)| payload)
}

/// Decode a base64 payload returned by a service.
///
/// # Errors
///
/// Returns [`AgentError::MalformedResponse`] if the payload is not valid base64.
pub fn decode_base64(payload: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(payload.trim())
        .map_err(|e| AgentError::MalformedResponse(format!("invalid base64 payload: {e}")))
}
