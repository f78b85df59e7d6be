//! Playback scheduler: the player state machine.
//!
//! ```text
//!   Idle ──play──→ Playing ──stop/pause──→ Stopped/Paused
//!    ▲               │  ▲                        │
//!    └──finish───────┘  └───────play─────────────┘
//! ```
//!
//! The player runs as one Tokio task that owns all playback state (index,
//! playing flag, cancellation token, configuration). Everything reaches it as
//! a [`Message`]: user commands from [`PlayerHandle`], fetch resolutions and
//! "playback ended" notifications. Every asynchronous continuation carries the
//! token (and signature) current when it was issued; a continuation whose
//! token no longer matches is dropped without touching state.
//!
//! Loading is not a separate state. It is `playing == true` with no audio
//! started yet, surfaced as [`PlayerStatus::Loading`].

use std::sync::Arc;

use readaloud_core::{
    Backend, ConfigSignature, PlaybackConfig, PlayerStatus, PositionSink, Segmentation,
    SynthesisPort, next_paragraph_start, prev_paragraph_target,
};
use tokio::sync::{mpsc, oneshot};

use crate::audio_io::{AudioOutput, PlaybackDone};
use crate::cache::{DecodeCache, FetchResult};
use crate::error::{PlayerError, SegmentError};
use crate::gate::SynthesisGate;

// ── Configuration ──────────────────────────────────────────────────

/// Adjacent failed segments after which playback stops instead of skipping.
pub const MAX_CONSECUTIVE_FAILURES: usize = 3;

/// Cache window around the current segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Decoded segments kept behind the current one.
    pub keep_behind: usize,
    /// Segments synthesized ahead of the current one.
    pub prefetch_ahead: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            keep_behind: 2,
            prefetch_ahead: 3,
        }
    }
}

/// External collaborators of the player.
#[derive(Clone)]
pub struct PlayerPorts {
    pub synthesis: Arc<dyn SynthesisPort>,
    pub output: Arc<dyn AudioOutput>,
    pub sink: Arc<dyn PositionSink>,
}

/// Point-in-time view of the player, returned by every command.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub index: usize,
    pub playing: bool,
    pub token: u64,
    pub total: usize,
    pub status: PlayerStatus,
    pub config: PlaybackConfig,
    /// Indices with decoded audio ready.
    pub cached: Vec<usize>,
    /// Synthesis requests started and not yet resolved.
    pub in_flight: usize,
}

// ── Messages ───────────────────────────────────────────────────────

#[derive(Debug)]
enum Command {
    Play(Option<usize>),
    Pause,
    Stop,
    Seek(usize),
    NextSegment,
    PrevSegment,
    NextParagraph,
    PrevParagraph,
    ChangeConfig(PlaybackConfig),
    SetVoice(String),
    SetSpeed(f32),
    SetBackend(Backend),
    Snapshot,
}

enum Message {
    Command {
        command: Command,
        reply: oneshot::Sender<Result<PlayerSnapshot, PlayerError>>,
    },
    /// The foreground fetch for `index` resolved.
    Fetched {
        token: u64,
        signature: ConfigSignature,
        index: usize,
        result: FetchResult,
    },
    /// Audio for `index` drained naturally.
    Ended { token: u64, index: usize },
    Shutdown,
}

// ── Handle ─────────────────────────────────────────────────────────

struct HandleInner {
    tx: mpsc::UnboundedSender<Message>,
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        let _ = self.tx.send(Message::Shutdown);
    }
}

/// Cloneable command interface to a running player.
///
/// The player task shuts down when the last handle is dropped.
#[derive(Clone)]
pub struct PlayerHandle {
    inner: Arc<HandleInner>,
}

impl std::fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerHandle")
            .field("closed", &self.inner.tx.is_closed())
            .finish()
    }
}

impl PlayerHandle {
    /// Start playing at `index`, or at the current index when `None`.
    ///
    /// `play(None)` while already playing is a no-op.
    pub async fn play(&self, index: Option<usize>) -> Result<PlayerSnapshot, PlayerError> {
        self.request(Command::Play(index)).await
    }

    pub async fn pause(&self) -> Result<PlayerSnapshot, PlayerError> {
        self.request(Command::Pause).await
    }

    pub async fn stop(&self) -> Result<PlayerSnapshot, PlayerError> {
        self.request(Command::Stop).await
    }

    /// Move to `index`; restarts audio there only if currently playing.
    pub async fn seek(&self, index: usize) -> Result<PlayerSnapshot, PlayerError> {
        self.request(Command::Seek(index)).await
    }

    pub async fn next_segment(&self) -> Result<PlayerSnapshot, PlayerError> {
        self.request(Command::NextSegment).await
    }

    pub async fn prev_segment(&self) -> Result<PlayerSnapshot, PlayerError> {
        self.request(Command::PrevSegment).await
    }

    pub async fn next_paragraph(&self) -> Result<PlayerSnapshot, PlayerError> {
        self.request(Command::NextParagraph).await
    }

    pub async fn prev_paragraph(&self) -> Result<PlayerSnapshot, PlayerError> {
        self.request(Command::PrevParagraph).await
    }

    pub async fn change_config(
        &self,
        config: PlaybackConfig,
    ) -> Result<PlayerSnapshot, PlayerError> {
        self.request(Command::ChangeConfig(config)).await
    }

    pub async fn set_voice(&self, voice: impl Into<String>) -> Result<PlayerSnapshot, PlayerError> {
        self.request(Command::SetVoice(voice.into())).await
    }

    pub async fn set_speed(&self, speed: f32) -> Result<PlayerSnapshot, PlayerError> {
        self.request(Command::SetSpeed(speed)).await
    }

    pub async fn set_backend(&self, backend: Backend) -> Result<PlayerSnapshot, PlayerError> {
        self.request(Command::SetBackend(backend)).await
    }

    pub async fn snapshot(&self) -> Result<PlayerSnapshot, PlayerError> {
        self.request(Command::Snapshot).await
    }

    /// Stop playback and end the player task.
    pub fn shutdown(&self) {
        let _ = self.inner.tx.send(Message::Shutdown);
    }

    async fn request(&self, command: Command) -> Result<PlayerSnapshot, PlayerError> {
        let (reply, rx) = oneshot::channel();
        self.inner
            .tx
            .send(Message::Command { command, reply })
            .map_err(|_| PlayerError::SchedulerGone)?;
        rx.await.map_err(|_| PlayerError::SchedulerGone)?
    }
}

/// Spawn the player task for `segments`. Must be called within a Tokio runtime.
pub fn spawn_player(
    segments: Segmentation,
    config: PlaybackConfig,
    ports: PlayerPorts,
    settings: PlayerConfig,
) -> PlayerHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let gate = SynthesisGate::new();
    let cache = DecodeCache::new(Arc::clone(&ports.synthesis), gate.clone());

    let player = Player {
        segments,
        config,
        settings,
        cache,
        gate,
        synthesis: ports.synthesis,
        output: ports.output,
        sink: ports.sink,
        tx: tx.clone(),
        index: 0,
        playing: false,
        token: 0,
        status: PlayerStatus::Idle,
        retried: false,
        failures: None,
    };

    tracing::debug!(
        total = player.segments.len(),
        config = %player.config.signature(),
        "Spawning player"
    );
    tokio::spawn(player.run(rx));

    PlayerHandle {
        inner: Arc::new(HandleInner { tx }),
    }
}

// ── Player task ────────────────────────────────────────────────────

struct Player {
    segments: Segmentation,
    config: PlaybackConfig,
    settings: PlayerConfig,
    cache: DecodeCache,
    gate: SynthesisGate,
    synthesis: Arc<dyn SynthesisPort>,
    output: Arc<dyn AudioOutput>,
    sink: Arc<dyn PositionSink>,
    tx: mpsc::UnboundedSender<Message>,

    index: usize,
    playing: bool,
    token: u64,
    status: PlayerStatus,
    /// The current segment's fetch has already been retried after a cancel.
    retried: bool,
    failures: Option<FailureStreak>,
}

/// Run of adjacent segments that failed to synthesize.
#[derive(Debug, Clone, Copy)]
struct FailureStreak {
    first: usize,
    count: usize,
}

impl Player {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Message>) {
        while let Some(message) = rx.recv().await {
            match message {
                Message::Command { command, reply } => {
                    let result = self.handle_command(command).map(|()| self.snapshot());
                    let _ = reply.send(result);
                }
                Message::Fetched {
                    token,
                    signature,
                    index,
                    result,
                } => self.on_fetched(token, &signature, index, result),
                Message::Ended { token, index } => self.on_ended(token, index),
                Message::Shutdown => break,
            }
        }

        self.token += 1;
        self.playing = false;
        self.output.stop();
        self.cache.cancel_in_flight();
        tracing::debug!("Player task shutting down");
    }

    fn total(&self) -> usize {
        self.segments.len()
    }

    fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            index: self.index,
            playing: self.playing,
            token: self.token,
            total: self.total(),
            status: self.status.clone(),
            config: self.config.clone(),
            cached: self.cache.cached_indices(),
            in_flight: self.cache.in_flight_count(),
        }
    }

    fn set_status(&mut self, status: PlayerStatus) {
        tracing::debug!(status = %status, "Player status");
        self.sink.on_status_changed(&status);
        self.status = status;
    }

    fn check_index(&self, index: usize) -> Result<(), PlayerError> {
        if index < self.total() {
            Ok(())
        } else {
            Err(PlayerError::IndexOutOfRange {
                index,
                total: self.total(),
            })
        }
    }

    // ── Commands ───────────────────────────────────────────────────

    fn handle_command(&mut self, command: Command) -> Result<(), PlayerError> {
        tracing::trace!(?command, "Player command");
        match command {
            Command::Play(index) => self.play(index),
            Command::Pause => {
                self.halt(PlayerStatus::Paused { index: self.index });
                Ok(())
            }
            Command::Stop => {
                self.halt(PlayerStatus::Stopped { index: self.index });
                Ok(())
            }
            Command::Seek(index) => self.seek(index),
            Command::NextSegment => {
                if self.index + 1 < self.total() {
                    self.seek(self.index + 1)?;
                }
                Ok(())
            }
            Command::PrevSegment => {
                if self.index > 0 && self.total() > 0 {
                    self.seek(self.index - 1)?;
                }
                Ok(())
            }
            Command::NextParagraph => {
                if let Some(target) = next_paragraph_start(&self.segments.meta, self.index) {
                    self.seek(target)?;
                }
                Ok(())
            }
            Command::PrevParagraph => {
                if self.total() > 0 {
                    let target = prev_paragraph_target(&self.segments.meta, self.index);
                    self.seek(target)?;
                }
                Ok(())
            }
            Command::ChangeConfig(config) => {
                self.change_config(config);
                Ok(())
            }
            Command::SetVoice(voice) => {
                self.change_config(self.config.with_voice(voice));
                Ok(())
            }
            Command::SetSpeed(speed) => {
                self.change_config(self.config.with_speed(speed));
                Ok(())
            }
            Command::SetBackend(backend) => {
                self.change_config(self.config.with_backend(backend));
                Ok(())
            }
            Command::Snapshot => Ok(()),
        }
    }

    fn play(&mut self, index: Option<usize>) -> Result<(), PlayerError> {
        if self.segments.is_empty() {
            self.set_status(PlayerStatus::NothingToSpeak);
            return Err(PlayerError::NothingToSpeak);
        }
        match index {
            Some(index) => {
                self.check_index(index)?;
                self.start(index);
            }
            None if self.playing => {}
            None => self.start(self.index.min(self.total() - 1)),
        }
        Ok(())
    }

    /// Shared body of `stop` and `pause`; only the status label differs.
    fn halt(&mut self, status: PlayerStatus) {
        self.token += 1;
        self.playing = false;
        self.output.stop();
        let aborted = self.cache.cancel_in_flight();
        if aborted > 0 {
            self.hint_cancel(self.config.backend);
        }
        tracing::debug!(index = self.index, aborted, "Playback halted");
        self.set_status(status);
    }

    fn seek(&mut self, index: usize) -> Result<(), PlayerError> {
        self.check_index(index)?;

        if self.playing {
            self.output.stop();
            let aborted =
                self.cache
                    .cancel_outside(index, self.settings.keep_behind, self.settings.prefetch_ahead);
            tracing::debug!(from = self.index, to = index, aborted, "Seeking");
            self.start(index);
            return Ok(());
        }

        self.token += 1;
        self.index = index;
        self.sink.on_position_changed(index);
        let status = match self.status {
            PlayerStatus::Paused { .. } => PlayerStatus::Paused { index },
            PlayerStatus::Stopped { .. } => PlayerStatus::Stopped { index },
            _ => PlayerStatus::Idle,
        };
        self.set_status(status);
        Ok(())
    }

    fn change_config(&mut self, config: PlaybackConfig) {
        if config == self.config {
            return;
        }
        let old_backend = self.config.backend;
        tracing::info!(
            from = %self.config.signature(),
            to = %config.signature(),
            playing = self.playing,
            "Playback configuration changed"
        );

        self.config = config;
        self.token += 1;
        let aborted = self.cache.reset(self.config.signature());
        if aborted > 0 {
            self.hint_cancel(old_backend);
        }

        if self.playing && !self.segments.is_empty() {
            self.start(self.index);
        }
    }

    /// Best-effort server-side cancellation, queued behind nothing newer.
    fn hint_cancel(&self, backend: Backend) {
        let ticket = self.gate.ticket();
        let synthesis = Arc::clone(&self.synthesis);
        tokio::spawn(async move {
            if let Err(e) = ticket.run(synthesis.cancel(backend)).await {
                tracing::debug!(error = %e, "Cancel hint failed");
            }
        });
    }

    // ── Playback ───────────────────────────────────────────────────

    fn start(&mut self, index: usize) {
        self.token += 1;
        self.index = index;
        self.playing = true;
        self.retried = false;
        self.output.stop();
        self.sink.on_position_changed(index);
        self.set_status(PlayerStatus::Loading { index });

        self.request_current();
        self.prefetch(index);
    }

    fn request_current(&self) {
        let index = self.index;
        let fetch = self
            .cache
            .get_or_fetch(&self.config, index, &self.segments.texts[index]);
        let tx = self.tx.clone();
        let token = self.token;
        let signature = self.config.signature();
        tokio::spawn(async move {
            let result = fetch.await;
            let _ = tx.send(Message::Fetched {
                token,
                signature,
                index,
                result,
            });
        });
    }

    fn prefetch(&self, index: usize) {
        let last = index
            .saturating_add(self.settings.prefetch_ahead)
            .min(self.total().saturating_sub(1));
        for ahead in index + 1..=last {
            // Results land in the cache; nothing awaits them here.
            drop(
                self.cache
                    .get_or_fetch(&self.config, ahead, &self.segments.texts[ahead]),
            );
        }
    }

    fn on_fetched(
        &mut self,
        token: u64,
        signature: &ConfigSignature,
        index: usize,
        result: FetchResult,
    ) {
        if token != self.token
            || !self.playing
            || index != self.index
            || *signature != self.config.signature()
        {
            tracing::debug!(index, token, live = self.token, "Discarding stale fetch");
            return;
        }

        match result {
            Ok(audio) => {
                let tx = self.tx.clone();
                let on_done: PlaybackDone = Box::new(move || {
                    let _ = tx.send(Message::Ended { token, index });
                });
                match self.output.play(audio, on_done) {
                    Ok(()) => {
                        self.failures = None;
                        let total = self.total();
                        self.set_status(PlayerStatus::Playing { index, total });
                        self.sink.on_segment_started(index);
                        self.cache.retain_window(
                            index,
                            self.settings.keep_behind,
                            self.settings.prefetch_ahead,
                        );
                    }
                    Err(e) => {
                        tracing::error!(index, error = %e, "Audio output failed");
                        self.token += 1;
                        self.playing = false;
                        self.set_status(PlayerStatus::SegmentFailed {
                            index,
                            reason: e.to_string(),
                        });
                    }
                }
            }
            Err(SegmentError::Cancelled) if !self.retried => {
                // Aborted underneath a live request: ask once more.
                tracing::debug!(index, "Foreground fetch was cancelled, retrying");
                self.retried = true;
                self.request_current();
            }
            Err(e) => self.on_segment_failed(index, &e),
        }
    }

    /// Report a failed segment and skip it, or give up once
    /// [`MAX_CONSECUTIVE_FAILURES`] adjacent segments have failed.
    fn on_segment_failed(&mut self, index: usize, error: &SegmentError) {
        let streak = match self.failures {
            Some(s) if s.first + s.count == index => FailureStreak {
                count: s.count + 1,
                ..s
            },
            _ => FailureStreak {
                first: index,
                count: 1,
            },
        };
        self.failures = Some(streak);

        tracing::warn!(index, error = %error, failed = streak.count, "Segment failed");
        self.set_status(PlayerStatus::SegmentFailed {
            index,
            reason: error.to_string(),
        });

        if streak.count >= MAX_CONSECUTIVE_FAILURES {
            self.give_up(streak.first);
        } else {
            self.advance(index);
        }
    }

    /// Stop at the first segment of a failure streak.
    fn give_up(&mut self, first: usize) {
        self.token += 1;
        self.playing = false;
        self.failures = None;
        self.output.stop();
        if self.cache.cancel_in_flight() > 0 {
            self.hint_cancel(self.config.backend);
        }
        self.index = first;
        self.sink.on_position_changed(first);
        tracing::warn!(
            index = first,
            backend = %self.config.backend,
            "Too many consecutive segment failures, stopping"
        );
        self.set_status(PlayerStatus::NoVoiceAvailable {
            backend: self.config.backend,
        });
    }

    fn on_ended(&mut self, token: u64, index: usize) {
        if token != self.token || !self.playing || index != self.index {
            tracing::debug!(index, token, live = self.token, "Ignoring stale playback end");
            return;
        }
        self.advance(index);
    }

    fn advance(&mut self, from: usize) {
        if from + 1 < self.total() {
            self.start(from + 1);
        } else {
            self.finish();
        }
    }

    fn finish(&mut self) {
        self.token += 1;
        self.playing = false;
        self.index = 0;
        tracing::info!(total = self.total(), "Reached end of document");
        self.set_status(PlayerStatus::Finished);
        self.sink.on_position_changed(0);
        self.sink.on_finished();
    }
}
