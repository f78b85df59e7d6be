//! Internal error types for TTS server operations.
//!
//! These errors are internal to `readaloud-tts` and are mapped to
//! [`SynthesisError`] at the port boundary.

use readaloud_core::SynthesisError;
use thiserror::Error;

/// Result type alias for TTS client operations.
pub type TtsResult<T> = Result<T, TtsError>;

/// Errors related to TTS server requests.
#[derive(Debug, Error)]
pub enum TtsError {
    /// Request failed with an HTTP error status.
    #[error("TTS request to {url} failed with status {status}: {reason}")]
    ApiRequestFailed {
        /// HTTP status code
        status: u16,
        /// Body text or canonical reason
        reason: String,
        /// The URL that was requested
        url: String,
    },

    /// The server answered successfully with an empty body.
    #[error("TTS server returned no audio")]
    EmptyAudio,

    /// Network or HTTP client error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl From<TtsError> for SynthesisError {
    fn from(err: TtsError) -> Self {
        match err {
            TtsError::ApiRequestFailed { status, reason, .. } => Self::Backend { status, reason },
            TtsError::EmptyAudio => Self::EmptyAudio,
            TtsError::Network(e) => Self::Transport(e.to_string()),
            TtsError::InvalidUrl(e) => Self::Transport(format!("invalid URL: {e}")),
            TtsError::JsonParse(e) => Self::Transport(format!("invalid response: {e}")),
        }
    }
}
