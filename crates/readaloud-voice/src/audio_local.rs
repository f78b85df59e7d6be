//! Local rodio adapter for the [`AudioOutput`] trait.

use std::sync::Arc;

use crate::audio_io::{AudioOutput, PlaybackDone};
use crate::audio_thread::AudioThreadHandle;
use crate::decode::DecodedAudio;
use crate::error::OutputError;

/// Plays segments on the default output device via [`AudioThreadHandle`].
pub struct LocalAudioOutput {
    handle: AudioThreadHandle,
}

impl LocalAudioOutput {
    /// Spawn the audio thread and open the default device.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if no output device can be opened.
    pub fn open() -> Result<Self, OutputError> {
        Ok(Self {
            handle: AudioThreadHandle::spawn()?,
        })
    }
}

impl AudioOutput for LocalAudioOutput {
    fn play(&self, audio: Arc<DecodedAudio>, on_done: PlaybackDone) -> Result<(), OutputError> {
        self.handle.play(audio, on_done)
    }

    fn stop(&self) {
        self.handle.stop();
    }

    fn is_playing(&self) -> bool {
        self.handle.is_playing()
    }
}
