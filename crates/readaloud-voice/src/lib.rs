//! Incremental speech playback.
//!
//! Turns a [`Document`] into speakable segments and plays them back while the
//! remote synthesis service is still producing later ones:
//!
//! ```text
//!   Document ─segment()→ Segmentation ─┐
//!                                      ▼
//!   PlayerHandle ─cmd→ scheduler task ─get_or_fetch→ DecodeCache ─ticket→ SynthesisGate ─→ SynthesisPort
//!                          ▲   │                         │
//!                 Ended ───┘   └─play→ AudioOutput        └─decode (blocking pool)
//! ```
//!
//! [`ReaderSession`] wires preferences, segmentation and the player together.

pub mod audio_io;
pub mod audio_local;
pub mod audio_thread;
pub mod cache;
pub mod decode;
pub mod document;
pub mod error;
pub mod gate;
pub mod playback;
pub mod scheduler;
pub mod segmenter;
pub mod session;

// Re-export key types for convenience
pub use audio_io::{AudioOutput, PlaybackDone};
pub use audio_local::LocalAudioOutput;
pub use cache::{CacheKey, DecodeCache};
pub use decode::{DecodedAudio, decode_audio};
pub use document::{Block, BlockKind, Document, strip_markdown};
pub use error::{DecodeError, OutputError, PlayerError, SegmentError};
pub use gate::{GateTicket, SynthesisGate};
pub use scheduler::{
    MAX_CONSECUTIVE_FAILURES, PlayerConfig, PlayerHandle, PlayerPorts, PlayerSnapshot,
    spawn_player,
};
pub use segmenter::{SPLIT_WINDOW, segment};
pub use session::{ReaderSession, SessionOptions, SessionPorts};

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;
