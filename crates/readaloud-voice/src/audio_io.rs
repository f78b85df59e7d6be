//! `AudioOutput` trait abstraction for segment playback.
//!
//! Decouples the player from any specific audio backend:
//!
//! | Implementor | Where used |
//! |---|---|
//! | [`LocalAudioOutput`](crate::audio_local::LocalAudioOutput) | CLI: rodio playback on the default output device |
//! | test doubles | scheduler tests: record plays and complete on demand |
//!
//! The trait is **object-safe** (`Arc<dyn AudioOutput>`). All methods take
//! `&self`; implementations use interior mutability (channels, atomics).

use std::sync::Arc;

use crate::decode::DecodedAudio;
use crate::error::OutputError;

/// Callback invoked when a segment finishes playing naturally.
///
/// Never invoked for playback interrupted by [`AudioOutput::stop`] or by a
/// newer [`AudioOutput::play`].
pub type PlaybackDone = Box<dyn FnOnce() + Send + 'static>;

/// Abstraction over an audio output sink.
pub trait AudioOutput: Send + Sync {
    /// Replace whatever is playing with `audio`.
    ///
    /// `on_done` fires from a background thread/task once the audio drains.
    fn play(&self, audio: Arc<DecodedAudio>, on_done: PlaybackDone) -> Result<(), OutputError>;

    /// Stop playback immediately. Idempotent.
    fn stop(&self);

    /// Whether audio is currently playing.
    fn is_playing(&self) -> bool;
}
