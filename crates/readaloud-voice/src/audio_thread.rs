//! Dedicated audio output thread: isolates `!Send` rodio resources from the
//! async runtime.
//!
//! `rodio::OutputStream` is `!Send` on some platforms. Rather than using
//! `unsafe impl Send/Sync`, it is confined to a single OS thread and driven
//! through [`AudioCommand`]s sent over a channel.

use std::sync::{Arc, mpsc};
use std::thread;

use crate::audio_io::PlaybackDone;
use crate::decode::DecodedAudio;
use crate::error::OutputError;
use crate::playback::AudioPlayback;

// ── Commands ───────────────────────────────────────────────────────

/// A command sent to the audio thread.
enum AudioCommand {
    /// Replace current playback with `audio`.
    Play {
        audio: Arc<DecodedAudio>,
        on_done: PlaybackDone,
        reply: mpsc::Sender<Result<(), OutputError>>,
    },

    /// Stop any active playback (fire-and-forget).
    Stop,

    /// Query whether audio is currently playing.
    IsPlaying { reply: mpsc::Sender<bool> },

    /// Shut down the audio thread, releasing the output device.
    Shutdown,
}

// ── Handle (Send + Sync proxy) ─────────────────────────────────────

/// `Send + Sync` handle to the dedicated audio thread.
///
/// Request–reply methods block the caller until the audio thread responds,
/// which takes microseconds plus the audio operation itself.
pub struct AudioThreadHandle {
    cmd_tx: mpsc::Sender<AudioCommand>,
    thread: Option<thread::JoinHandle<()>>,
}

impl AudioThreadHandle {
    /// Spawn the audio thread, open the output device and return the handle.
    ///
    /// Device errors are propagated back through a one-shot init channel.
    pub fn spawn() -> Result<Self, OutputError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<AudioCommand>();
        let (init_tx, init_rx) = mpsc::channel::<Result<(), OutputError>>();

        let thread = thread::Builder::new()
            .name("readaloud-audio".into())
            .spawn(move || Self::run(&cmd_rx, &init_tx))
            .map_err(|e| OutputError::OutputStream(format!("failed to spawn audio thread: {e}")))?;

        init_rx.recv().map_err(|_| OutputError::AudioThreadDied)??;

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }

    pub fn play(&self, audio: Arc<DecodedAudio>, on_done: PlaybackDone) -> Result<(), OutputError> {
        let (reply, rx) = mpsc::channel();
        self.cmd_tx
            .send(AudioCommand::Play {
                audio,
                on_done,
                reply,
            })
            .map_err(|_| OutputError::AudioThreadDied)?;
        rx.recv().map_err(|_| OutputError::AudioThreadDied)?
    }

    pub fn stop(&self) {
        let _ = self.cmd_tx.send(AudioCommand::Stop);
    }

    pub fn is_playing(&self) -> bool {
        let (reply, rx) = mpsc::channel();
        if self.cmd_tx.send(AudioCommand::IsPlaying { reply }).is_err() {
            return false;
        }
        rx.recv().unwrap_or(false)
    }

    // ── Audio thread event loop ────────────────────────────────────

    fn run(cmd_rx: &mpsc::Receiver<AudioCommand>, init_tx: &mpsc::Sender<Result<(), OutputError>>) {
        let mut playback = match AudioPlayback::new() {
            Ok(p) => p,
            Err(e) => {
                let _ = init_tx.send(Err(e));
                return;
            }
        };

        if init_tx.send(Ok(())).is_err() {
            return;
        }

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                AudioCommand::Play {
                    audio,
                    on_done,
                    reply,
                } => {
                    let _ = reply.send(playback.play(&audio, on_done));
                }
                AudioCommand::Stop => playback.stop(),
                AudioCommand::IsPlaying { reply } => {
                    let _ = reply.send(playback.is_playing());
                }
                AudioCommand::Shutdown => break,
            }
        }

        playback.stop();
        tracing::debug!("Audio thread shutting down");
    }
}

impl Drop for AudioThreadHandle {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(AudioCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}
