//! Position and status notification port.
//!
//! The player reports every position change, status transition and the
//! terminal "finished" event through a [`PositionSink`]. Calls are
//! fire-and-forget from the player task, so implementations must return
//! quickly (forward to a channel, update a label, etc.).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::Backend;

/// User-visible status of the player.
///
/// Indices are zero-based here; `Display` renders them one-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlayerStatus {
    Idle,
    /// Waiting for synthesis/decoding of `index`.
    Loading {
        index: usize,
    },
    Playing {
        index: usize,
        total: usize,
    },
    Paused {
        index: usize,
    },
    Stopped {
        index: usize,
    },
    /// Segment could not be synthesized or decoded; playback moves on.
    SegmentFailed {
        index: usize,
        reason: String,
    },
    Finished,
    /// The document produced no segments.
    NothingToSpeak,
    NoVoiceAvailable {
        backend: Backend,
    },
}

impl PlayerStatus {
    /// Short machine-friendly label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading { .. } => "loading",
            Self::Playing { .. } => "playing",
            Self::Paused { .. } => "paused",
            Self::Stopped { .. } => "stopped",
            Self::SegmentFailed { .. } => "segment_failed",
            Self::Finished => "finished",
            Self::NothingToSpeak => "nothing_to_speak",
            Self::NoVoiceAvailable { .. } => "no_voice_available",
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(
            self,
            Self::SegmentFailed { .. } | Self::NothingToSpeak | Self::NoVoiceAvailable { .. }
        )
    }
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("Idle"),
            Self::Loading { index } => write!(f, "Loading segment {}", index + 1),
            Self::Playing { index, total } => write!(f, "Playing {} / {total}", index + 1),
            Self::Paused { index } => write!(f, "Paused at segment {}", index + 1),
            Self::Stopped { index } => write!(f, "Stopped at segment {}", index + 1),
            Self::SegmentFailed { index, reason } => {
                write!(f, "Segment {} failed: {reason}", index + 1)
            }
            Self::Finished => f.write_str("Finished"),
            Self::NothingToSpeak => f.write_str("Nothing to read on this page"),
            Self::NoVoiceAvailable { backend } => write!(f, "No voice available for {backend}"),
        }
    }
}

/// Receiver of player notifications.
pub trait PositionSink: Send + Sync {
    /// The current segment index changed (before any audio is ready).
    fn on_position_changed(&self, index: usize);

    fn on_status_changed(&self, status: &PlayerStatus);

    /// Audio for `index` actually started playing.
    fn on_segment_started(&self, index: usize) {
        let _ = index;
    }

    /// The last segment finished naturally.
    fn on_finished(&self);
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPositionSink;

impl PositionSink for NoopPositionSink {
    fn on_position_changed(&self, _index: usize) {}

    fn on_status_changed(&self, _status: &PlayerStatus) {}

    fn on_finished(&self) {}
}
