//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the player expects from infrastructure. They
//! contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No `reqwest` or `rodio` types in any signature
//! - Async ports use `async_trait` so they stay object-safe behind `Arc<dyn _>`
//! - Notification ports are synchronous and must not block

pub mod position_sink;
pub mod preferences;
pub mod synthesis;

pub use position_sink::{NoopPositionSink, PlayerStatus, PositionSink};
pub use preferences::{MemoryPreferenceStore, PreferenceStore, PreferenceStoreError};
pub use synthesis::{SynthesisError, SynthesisPort};
