//! Audio playback via `rodio`.
//!
//! Plays one decoded segment at a time and reports natural completion
//! through a callback.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};

use crate::audio_io::PlaybackDone;
use crate::decode::DecodedAudio;
use crate::error::OutputError;

/// Audio playback handle for segment output.
///
/// `OutputStream` is `!Send` on some platforms, so this type lives on the
/// audio thread (see [`AudioThreadHandle`](crate::audio_thread::AudioThreadHandle)).
pub struct AudioPlayback {
    /// rodio output stream (must be kept alive).
    _stream: OutputStream,

    /// Handle used to create sinks.
    stream_handle: OutputStreamHandle,

    /// Current playback sink (if any).
    sink: Option<Arc<Sink>>,

    /// Whether the current sink is still owned by a live `play` call.
    ///
    /// Each play gets its own flag so a stopped sink's watcher can never
    /// fire the callback of a later one.
    active: Option<Arc<AtomicBool>>,
}

impl AudioPlayback {
    /// Open the default output device.
    pub fn new() -> Result<Self, OutputError> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| OutputError::OutputStream(e.to_string()))?;

        tracing::info!("Audio playback initialized on default output device");

        Ok(Self {
            _stream: stream,
            stream_handle,
            sink: None,
            active: None,
        })
    }

    /// Play `audio`, replacing any current playback. `on_done` runs when the
    /// sink drains without having been stopped.
    pub fn play(&mut self, audio: &DecodedAudio, on_done: PlaybackDone) -> Result<(), OutputError> {
        self.stop();

        let sink = Arc::new(
            Sink::try_new(&self.stream_handle)
                .map_err(|e| OutputError::OutputStream(e.to_string()))?,
        );
        sink.append(SamplesBuffer::new(
            audio.channels,
            audio.sample_rate,
            audio.samples.clone(),
        ));

        let active = Arc::new(AtomicBool::new(true));
        self.sink = Some(Arc::clone(&sink));
        self.active = Some(Arc::clone(&active));

        tracing::debug!(
            sample_rate = audio.sample_rate,
            duration_ms = audio.duration.as_millis(),
            "Audio playback started"
        );

        // `sleep_until_end()` blocks until the queue drains or `stop()` drops
        // the sources.
        std::thread::spawn(move || {
            sink.sleep_until_end();
            if active.swap(false, Ordering::SeqCst) {
                tracing::debug!("Playback finished naturally");
                on_done();
            }
        });
        Ok(())
    }

    /// Stop any active playback immediately.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            active.store(false, Ordering::SeqCst);
        }
        if let Some(sink) = self.sink.take() {
            sink.stop();
            tracing::debug!("Audio playback stopped");
        }
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.sink.as_ref().is_some_and(|sink| !sink.empty())
    }
}
