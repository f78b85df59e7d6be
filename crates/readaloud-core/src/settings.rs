//! Persisted reader preferences and validation.
//!
//! These are pure domain types with no infrastructure dependencies. Storage
//! lives behind [`PreferenceStore`](crate::ports::PreferenceStore).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Backend, MAX_SPEED, MIN_SPEED, PlaybackConfig};

/// Pages with at most this many segments never get progress persisted.
pub const LONG_PAGE_THRESHOLD: usize = 20;

/// Upper bound on stored per-page progress entries (oldest dropped first).
pub const MAX_PROGRESS_ENTRIES: usize = 200;

/// Last read position on one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageProgress {
    /// Segment index to resume from.
    pub index: usize,
    /// Segment count when the progress was recorded.
    pub total: usize,
    pub updated_at: DateTime<Utc>,
}

/// Reader preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub backend: Backend,
    pub voice: String,
    pub speed: f32,

    /// User star ratings per voice id (1–5).
    pub voice_ratings: BTreeMap<String, u8>,

    /// Reading progress keyed by page (URL or file path).
    pub progress: BTreeMap<String, PageProgress>,
}

impl Default for Preferences {
    fn default() -> Self {
        let config = PlaybackConfig::default();
        Self {
            backend: config.backend,
            voice: config.voice,
            speed: config.speed,
            voice_ratings: BTreeMap::new(),
            progress: BTreeMap::new(),
        }
    }
}

impl Preferences {
    /// The playback configuration these preferences describe.
    #[must_use]
    pub fn playback_config(&self) -> PlaybackConfig {
        let voice = if self.voice.trim().is_empty() {
            self.backend.default_voice().to_string()
        } else {
            self.voice.clone()
        };
        PlaybackConfig::new(self.backend, voice, self.speed)
    }

    /// Copy a playback configuration into the preferences.
    pub fn apply_config(&mut self, config: &PlaybackConfig) {
        self.backend = config.backend;
        self.voice.clone_from(&config.voice);
        self.speed = config.speed;
    }

    /// Record the reading position for `page`.
    ///
    /// Returns `false` (and stores nothing) for short pages. Once more than
    /// [`MAX_PROGRESS_ENTRIES`] pages are stored, the least recently updated
    /// ones are dropped.
    pub fn record_progress(
        &mut self,
        page: &str,
        index: usize,
        total: usize,
        now: DateTime<Utc>,
    ) -> bool {
        if total <= LONG_PAGE_THRESHOLD {
            return false;
        }
        self.progress.insert(
            page.to_string(),
            PageProgress {
                index: index.min(total.saturating_sub(1)),
                total,
                updated_at: now,
            },
        );
        self.prune_progress();
        true
    }

    /// Where to resume `page`, if progress was stored for the same segment count.
    #[must_use]
    pub fn resume_index(&self, page: &str, total: usize) -> Option<usize> {
        self.progress
            .get(page)
            .filter(|p| p.total == total && p.index < total)
            .map(|p| p.index)
    }

    /// Rate a voice from 1 to 5 stars.
    pub fn rate_voice(&mut self, voice: &str, stars: u8) -> Result<(), SettingsError> {
        if voice.trim().is_empty() {
            return Err(SettingsError::EmptyVoice);
        }
        if !(1..=5).contains(&stars) {
            return Err(SettingsError::InvalidRating(stars));
        }
        self.voice_ratings.insert(voice.to_string(), stars);
        Ok(())
    }

    fn prune_progress(&mut self) {
        if self.progress.len() <= MAX_PROGRESS_ENTRIES {
            return;
        }
        let mut by_age: Vec<_> = self
            .progress
            .iter()
            .map(|(page, p)| (p.updated_at, page.clone()))
            .collect();
        by_age.sort();
        let excess = self.progress.len() - MAX_PROGRESS_ENTRIES;
        for (_, page) in by_age.into_iter().take(excess) {
            self.progress.remove(&page);
        }
    }
}

/// Preference validation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("Speed must be between {MIN_SPEED} and {MAX_SPEED}, got {0}")]
    InvalidSpeed(f32),

    #[error("Voice rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("Voice id cannot be empty")]
    EmptyVoice,
}

/// Validate preference values.
pub fn validate_preferences(prefs: &Preferences) -> Result<(), SettingsError> {
    if !(MIN_SPEED..=MAX_SPEED).contains(&prefs.speed) {
        return Err(SettingsError::InvalidSpeed(prefs.speed));
    }

    if prefs.voice.trim().is_empty() {
        return Err(SettingsError::EmptyVoice);
    }

    if let Some((_, &stars)) = prefs
        .voice_ratings
        .iter()
        .find(|(_, stars)| !(1..=5).contains(*stars))
    {
        return Err(SettingsError::InvalidRating(stars));
    }

    Ok(())
}
