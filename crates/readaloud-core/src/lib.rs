//! Core domain types and port definitions for readaloud.
//!
//! This crate is infrastructure-free. It holds the segment and playback
//! configuration types shared by every adapter, the persisted preference
//! model, and the trait ports that the player drives:
//!
//! - [`ports::SynthesisPort`]: remote text-to-speech service
//! - [`ports::PreferenceStore`]: persisted preferences and reading progress
//! - [`ports::PositionSink`]: position/status notifications for the UI layer

pub mod domain;
pub mod paths;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    Backend, ConfigSignature, DEFAULT_SPEED, MAX_SPEED, MIN_SPEED, PlaybackConfig, Segment,
    SegmentThresholds, Segmentation, SourceRange, UnknownBackend, next_paragraph_start,
    paragraph_start, prev_paragraph_target,
};
pub use paths::{CONFIG_DIR_ENV, PathError, config_root, preferences_path};
pub use ports::{
    MemoryPreferenceStore, NoopPositionSink, PlayerStatus, PositionSink, PreferenceStore,
    PreferenceStoreError, SynthesisError, SynthesisPort,
};
pub use settings::{
    LONG_PAGE_THRESHOLD, MAX_PROGRESS_ENTRIES, PageProgress, Preferences, SettingsError,
    validate_preferences,
};
