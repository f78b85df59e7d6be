//! Playback configuration and its cache signature.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Slowest supported speech rate.
pub const MIN_SPEED: f32 = 0.5;

/// Fastest supported speech rate.
pub const MAX_SPEED: f32 = 2.0;

/// Normal speech rate.
pub const DEFAULT_SPEED: f32 = 1.0;

/// Character thresholds the segmenter uses for a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentThresholds {
    /// Sentences are coalesced until a segment reaches this length.
    pub min_chars: usize,
    /// Segments longer than this are split once near the midpoint.
    pub max_chars: usize,
}

/// Remote synthesis backends served by the TTS server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Kokoro (ONNX). Good prosody from sentence-length input.
    #[default]
    Kokoro,
    /// Piper. Fast, tolerates very short input.
    Piper,
    /// Coqui XTTS. Needs longer input and caps it at ~250 characters.
    Coqui,
}

impl Backend {
    /// Every known backend, in display order.
    pub const ALL: [Self; 3] = [Self::Kokoro, Self::Piper, Self::Coqui];

    /// Wire identifier.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Kokoro => "kokoro",
            Self::Piper => "piper",
            Self::Coqui => "coqui",
        }
    }

    #[must_use]
    pub const fn thresholds(self) -> SegmentThresholds {
        match self {
            Self::Kokoro => SegmentThresholds {
                min_chars: 60,
                max_chars: 300,
            },
            Self::Piper => SegmentThresholds {
                min_chars: 20,
                max_chars: 400,
            },
            Self::Coqui => SegmentThresholds {
                min_chars: 120,
                max_chars: 250,
            },
        }
    }

    /// Voices assumed to exist when the server cannot be asked.
    #[must_use]
    pub const fn fallback_voices(self) -> &'static [&'static str] {
        match self {
            Self::Kokoro => &["af_sarah", "af_bella", "am_adam", "bf_emma", "bm_george"],
            Self::Piper => &[
                "en_US-lessac-medium",
                "en_US-amy-medium",
                "en_GB-alan-medium",
            ],
            Self::Coqui => &["p225", "p243", "p270"],
        }
    }

    #[must_use]
    pub const fn default_voice(self) -> &'static str {
        self.fallback_voices()[0]
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Error returned when parsing an unknown backend id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown synthesis backend '{0}' (expected kokoro, piper or coqui)")]
pub struct UnknownBackend(pub String);

impl FromStr for Backend {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownBackend(s.to_string()))
    }
}

/// Voice configuration used for synthesis.
///
/// Any field change produces a different [`ConfigSignature`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    pub backend: Backend,
    pub voice: String,
    pub speed: f32,
}

impl PlaybackConfig {
    /// Build a config, clamping `speed` to the supported range.
    #[must_use]
    pub fn new(backend: Backend, voice: impl Into<String>, speed: f32) -> Self {
        Self {
            backend,
            voice: voice.into(),
            speed: clamp_speed(speed),
        }
    }

    #[must_use]
    pub fn signature(&self) -> ConfigSignature {
        ConfigSignature {
            backend: self.backend,
            voice: self.voice.clone(),
            speed_bits: clamp_speed(self.speed).to_bits(),
        }
    }

    #[must_use]
    pub fn with_voice(&self, voice: impl Into<String>) -> Self {
        Self::new(self.backend, voice, self.speed)
    }

    #[must_use]
    pub fn with_speed(&self, speed: f32) -> Self {
        Self::new(self.backend, self.voice.clone(), speed)
    }

    #[must_use]
    pub fn with_backend(&self, backend: Backend) -> Self {
        Self::new(backend, self.voice.clone(), self.speed)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self::new(Backend::default(), Backend::default().default_voice(), DEFAULT_SPEED)
    }
}

/// Value identity of a `(backend, voice, speed)` triple.
///
/// Used as the decode-cache partition key and as the staleness check for
/// synthesis results. Speed is compared bitwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigSignature {
    backend: Backend,
    voice: String,
    speed_bits: u32,
}

impl ConfigSignature {
    #[must_use]
    pub const fn backend(&self) -> Backend {
        self.backend
    }

    #[must_use]
    pub fn voice(&self) -> &str {
        &self.voice
    }

    #[must_use]
    pub const fn speed(&self) -> f32 {
        f32::from_bits(self.speed_bits)
    }
}

impl fmt::Display for ConfigSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{:.2}", self.backend, self.voice, self.speed())
    }
}

fn clamp_speed(speed: f32) -> f32 {
    if speed.is_nan() {
        DEFAULT_SPEED
    } else {
        speed.clamp(MIN_SPEED, MAX_SPEED)
    }
}
