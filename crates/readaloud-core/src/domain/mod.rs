//! Domain types shared by the segmenter, the player and the adapters.

pub mod playback;
pub mod segment;

pub use playback::{
    Backend, ConfigSignature, DEFAULT_SPEED, MAX_SPEED, MIN_SPEED, PlaybackConfig,
    SegmentThresholds, UnknownBackend,
};
pub use segment::{
    Segment, Segmentation, SourceRange, next_paragraph_start, paragraph_start,
    prev_paragraph_target,
};
