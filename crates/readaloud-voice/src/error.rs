//! Player error types.

use readaloud_core::{Backend, PreferenceStoreError, SettingsError, SynthesisError};

/// Errors returned by player and session commands.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    /// The document produced no speakable segments.
    #[error("Nothing to read: the document has no speakable text")]
    NothingToSpeak,

    /// A seek target outside `0..total`.
    #[error("Segment {index} is out of range (document has {total} segments)")]
    IndexOutOfRange { index: usize, total: usize },

    /// Neither the server nor the built-in list offers a voice.
    #[error("No voice available for backend {0}")]
    NoVoiceAvailable(Backend),

    /// Preference storage failed.
    #[error("Preference storage failed: {0}")]
    Preferences(#[from] PreferenceStoreError),

    /// A preference value was rejected.
    #[error("Invalid preference: {0}")]
    Settings(#[from] SettingsError),

    /// The audio device could not be used.
    #[error("Audio output failed: {0}")]
    Output(#[from] OutputError),

    /// The scheduler task is no longer running.
    #[error("Player has shut down")]
    SchedulerGone,
}

/// Why a single segment could not be produced.
///
/// `Clone` because one result is shared by every waiter of a coalesced request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SegmentError {
    #[error("{0}")]
    Synthesis(#[from] SynthesisError),

    #[error("{0}")]
    Decode(#[from] DecodeError),

    /// The request was aborted (stop, seek away, config change).
    #[error("Segment request cancelled")]
    Cancelled,

    /// The fetch task died without producing a result.
    #[error("Segment worker failed: {0}")]
    Worker(String),
}

/// Audio payload could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Unsupported or malformed audio: {0}")]
    Unsupported(String),

    #[error("Decoded audio contains no samples")]
    Empty,
}

/// Audio output device errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OutputError {
    /// Failed to open or use the output stream.
    #[error("Failed to open audio output stream: {0}")]
    OutputStream(String),

    /// The dedicated audio thread is gone.
    #[error("Audio thread died unexpectedly")]
    AudioThreadDied,
}
