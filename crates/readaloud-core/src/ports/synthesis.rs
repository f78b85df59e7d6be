//! Remote text-to-speech port.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Backend, PlaybackConfig};

/// Errors returned by a [`SynthesisPort`].
///
/// `Clone` so one failure can be handed to every waiter of a coalesced request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    /// The service answered with a non-success status.
    #[error("Synthesis backend returned {status}: {reason}")]
    Backend { status: u16, reason: String },

    /// The service answered successfully but sent no audio.
    #[error("Synthesis backend returned empty audio")]
    EmptyAudio,

    /// The request never completed (connect, timeout, body read).
    #[error("Synthesis transport error: {0}")]
    Transport(String),

    /// The request was abandoned before completion.
    #[error("Synthesis request cancelled")]
    Cancelled,
}

/// Text-to-speech service.
///
/// Stateless per call: implementations must not retry and must not cache.
#[async_trait]
pub trait SynthesisPort: Send + Sync {
    /// Synthesize `text` with `config` into an encoded audio payload.
    async fn synthesize(&self, text: &str, config: &PlaybackConfig)
    -> Result<Vec<u8>, SynthesisError>;

    /// Voice ids the service offers for `backend`.
    async fn list_voices(&self, backend: Backend) -> Result<Vec<String>, SynthesisError>;

    /// Ask the service to abandon work for `backend`.
    ///
    /// Best-effort; the default does nothing.
    async fn cancel(&self, backend: Backend) -> Result<(), SynthesisError> {
        let _ = backend;
        Ok(())
    }
}
