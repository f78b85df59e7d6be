//! CLI-specific error types and mappings.

use readaloud_core::PreferenceStoreError;
use readaloud_voice::{OutputError, PlayerError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Playback or session error.
    #[error("{0}")]
    Player(String),

    /// Malformed interactive command or argument.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audio device error.
    #[error("Audio error: {0}")]
    Audio(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions (see sysexits.h).
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Player(_) => 1,
            Self::Arguments(_) => 2, // EX_USAGE
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
            Self::Audio(_) => 69,    // EX_UNAVAILABLE
        }
    }
}

impl From<PlayerError> for CliError {
    fn from(err: PlayerError) -> Self {
        match err {
            PlayerError::Settings(e) => Self::Arguments(e.to_string()),
            PlayerError::Preferences(e) => Self::Config(e.to_string()),
            PlayerError::Output(e) => Self::Audio(e.to_string()),
            other => Self::Player(other.to_string()),
        }
    }
}

impl From<OutputError> for CliError {
    fn from(err: OutputError) -> Self {
        Self::Audio(err.to_string())
    }
}

impl From<PreferenceStoreError> for CliError {
    fn from(err: PreferenceStoreError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
