//! Reader session: preferences → configuration → segmentation → player.
//!
//! A session reads one page. It restores the stored reading position for
//! long pages, persists configuration changes and voice ratings, and records
//! the final position when closed. Preference storage failures never stop
//! playback; they are logged and the session continues with what it has.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use readaloud_core::{
    Backend, PlaybackConfig, PlayerStatus, PositionSink, PreferenceStore, Preferences,
    SettingsError, SynthesisPort,
};

use crate::audio_io::AudioOutput;
use crate::document::Document;
use crate::error::PlayerError;
use crate::scheduler::{PlayerConfig, PlayerHandle, PlayerPorts, PlayerSnapshot, spawn_player};
use crate::segmenter::segment;

/// External collaborators of a session.
#[derive(Clone)]
pub struct SessionPorts {
    pub synthesis: Arc<dyn SynthesisPort>,
    pub output: Arc<dyn AudioOutput>,
    pub sink: Arc<dyn PositionSink>,
    pub preferences: Arc<dyn PreferenceStore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub player: PlayerConfig,
    /// Fall back to each backend's built-in voice list when the server
    /// cannot list voices.
    pub fallback_voices: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            player: PlayerConfig::default(),
            fallback_voices: true,
        }
    }
}

/// One page being read aloud.
pub struct ReaderSession {
    page: String,
    texts: Vec<String>,
    player: PlayerHandle,
    prefs: Mutex<Preferences>,
    store: Arc<dyn PreferenceStore>,
    synthesis: Arc<dyn SynthesisPort>,
    sink: Arc<dyn PositionSink>,
    fallback_voices: bool,
}

impl std::fmt::Debug for ReaderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderSession")
            .field("page", &self.page)
            .field("total", &self.texts.len())
            .finish_non_exhaustive()
    }
}

impl ReaderSession {
    /// Segment `document` and start an idle player for it.
    ///
    /// `page` keys the stored reading progress (a URL or file path). When
    /// progress exists for the same segment count, the player is positioned
    /// there without starting audio.
    ///
    /// # Errors
    ///
    /// [`PlayerError::NothingToSpeak`] when the document has no speakable
    /// text (the sink is told as well).
    pub async fn open(
        page: impl Into<String>,
        document: &Document,
        ports: SessionPorts,
        options: SessionOptions,
    ) -> Result<Self, PlayerError> {
        let page = page.into();
        let prefs = match ports.preferences.load().await {
            Ok(prefs) => prefs,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load preferences, using defaults");
                Preferences::default()
            }
        };

        let config = prefs.playback_config();
        let segments = segment(document, config.backend.thresholds());
        if segments.is_empty() {
            ports.sink.on_status_changed(&PlayerStatus::NothingToSpeak);
            return Err(PlayerError::NothingToSpeak);
        }

        let total = segments.len();
        let texts = segments.texts.clone();
        let resume = prefs.resume_index(&page, total);

        tracing::info!(page = %page, total, config = %config.signature(), "Opening reader session");

        let player = spawn_player(
            segments,
            config,
            PlayerPorts {
                synthesis: Arc::clone(&ports.synthesis),
                output: ports.output,
                sink: Arc::clone(&ports.sink),
            },
            options.player,
        );

        if let Some(index) = resume {
            tracing::info!(index, "Resuming from stored position");
            player.seek(index).await?;
        }

        Ok(Self {
            page,
            texts,
            player,
            prefs: Mutex::new(prefs),
            store: ports.preferences,
            synthesis: ports.synthesis,
            sink: ports.sink,
            fallback_voices: options.fallback_voices,
        })
    }

    #[must_use]
    pub fn page(&self) -> &str {
        &self.page
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.texts.len()
    }

    #[must_use]
    pub fn segment_text(&self, index: usize) -> Option<&str> {
        self.texts.get(index).map(String::as_str)
    }

    /// Underlying player, for callers that want to share it.
    #[must_use]
    pub fn player(&self) -> &PlayerHandle {
        &self.player
    }

    /// Copy of the session's preferences.
    #[must_use]
    pub fn preferences(&self) -> Preferences {
        self.lock_prefs().clone()
    }

    // ── Playback commands ──────────────────────────────────────────

    pub async fn play(&self, index: Option<usize>) -> Result<PlayerSnapshot, PlayerError> {
        self.player.play(index).await
    }

    pub async fn pause(&self) -> Result<PlayerSnapshot, PlayerError> {
        self.player.pause().await
    }

    pub async fn stop(&self) -> Result<PlayerSnapshot, PlayerError> {
        self.player.stop().await
    }

    pub async fn seek(&self, index: usize) -> Result<PlayerSnapshot, PlayerError> {
        self.player.seek(index).await
    }

    pub async fn next_segment(&self) -> Result<PlayerSnapshot, PlayerError> {
        self.player.next_segment().await
    }

    pub async fn prev_segment(&self) -> Result<PlayerSnapshot, PlayerError> {
        self.player.prev_segment().await
    }

    pub async fn next_paragraph(&self) -> Result<PlayerSnapshot, PlayerError> {
        self.player.next_paragraph().await
    }

    pub async fn prev_paragraph(&self) -> Result<PlayerSnapshot, PlayerError> {
        self.player.prev_paragraph().await
    }

    pub async fn snapshot(&self) -> Result<PlayerSnapshot, PlayerError> {
        self.player.snapshot().await
    }

    // ── Configuration ──────────────────────────────────────────────

    pub async fn set_voice(&self, voice: &str) -> Result<PlayerSnapshot, PlayerError> {
        let voice = voice.trim();
        if voice.is_empty() {
            return Err(SettingsError::EmptyVoice.into());
        }
        let snapshot = self.player.set_voice(voice).await?;
        self.persist_config(&snapshot.config).await;
        Ok(snapshot)
    }

    /// Change the speech rate; values outside `0.5..=2.0` are clamped.
    pub async fn set_speed(&self, speed: f32) -> Result<PlayerSnapshot, PlayerError> {
        let snapshot = self.player.set_speed(speed).await?;
        self.persist_config(&snapshot.config).await;
        Ok(snapshot)
    }

    /// Switch backend, keeping the current voice if the new backend offers it.
    ///
    /// The segmentation of the open page is not redone.
    pub async fn set_backend(&self, backend: Backend) -> Result<PlayerSnapshot, PlayerError> {
        let voices = self.voices(backend).await?;
        let current = self.player.snapshot().await?.config;
        let voice = if voices.contains(&current.voice) {
            current.voice.clone()
        } else {
            voices[0].clone()
        };

        let config = PlaybackConfig::new(backend, voice, current.speed);
        let snapshot = self.player.change_config(config).await?;
        self.persist_config(&snapshot.config).await;
        Ok(snapshot)
    }

    /// Voices offered by `backend`.
    ///
    /// Asks the server first; on failure or an empty list, falls back to the
    /// backend's built-in list.
    ///
    /// # Errors
    ///
    /// [`PlayerError::NoVoiceAvailable`] when no voice can be found.
    pub async fn voices(&self, backend: Backend) -> Result<Vec<String>, PlayerError> {
        match self.synthesis.list_voices(backend).await {
            Ok(voices) if !voices.is_empty() => return Ok(voices),
            Ok(_) => tracing::debug!(%backend, "Server listed no voices"),
            Err(e) => tracing::warn!(%backend, error = %e, "Listing voices failed"),
        }

        let fallback: Vec<String> = if self.fallback_voices {
            backend
                .fallback_voices()
                .iter()
                .map(ToString::to_string)
                .collect()
        } else {
            Vec::new()
        };

        if fallback.is_empty() {
            self.sink
                .on_status_changed(&PlayerStatus::NoVoiceAvailable { backend });
            return Err(PlayerError::NoVoiceAvailable(backend));
        }
        Ok(fallback)
    }

    /// Rate a voice from 1 to 5 stars and persist the rating.
    pub async fn rate_voice(&self, voice: &str, stars: u8) -> Result<(), PlayerError> {
        let prefs = {
            let mut prefs = self.lock_prefs();
            prefs.rate_voice(voice, stars)?;
            prefs.clone()
        };
        self.save(&prefs).await;
        Ok(())
    }

    /// Record the reading position, persist preferences and stop the player.
    pub async fn close(self) -> Result<(), PlayerError> {
        let index = match self.player.snapshot().await {
            Ok(snapshot) => snapshot.index,
            Err(e) => {
                tracing::warn!(error = %e, "Player gone before close");
                0
            }
        };

        let prefs = {
            let mut prefs = self.lock_prefs();
            if prefs.record_progress(&self.page, index, self.texts.len(), Utc::now()) {
                tracing::debug!(page = %self.page, index, "Recorded reading progress");
            }
            prefs.clone()
        };
        self.save(&prefs).await;

        self.player.shutdown();
        Ok(())
    }

    // ── Internal helpers ───────────────────────────────────────────

    fn lock_prefs(&self) -> std::sync::MutexGuard<'_, Preferences> {
        self.prefs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn persist_config(&self, config: &PlaybackConfig) {
        let prefs = {
            let mut prefs = self.lock_prefs();
            prefs.apply_config(config);
            prefs.clone()
        };
        self.save(&prefs).await;
    }

    async fn save(&self, prefs: &Preferences) {
        if let Err(e) = self.store.save(prefs).await {
            tracing::warn!(error = %e, "Failed to save preferences");
        }
    }
}
