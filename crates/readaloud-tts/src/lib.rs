//! HTTP client for the local text-to-speech server.
//!
//! [`DefaultTtsClient`] implements [`readaloud_core::SynthesisPort`] against a
//! server speaking a small JSON protocol:
//!
//! - `POST /synthesize` with the text and voice settings, answered with audio bytes
//! - `GET /voices?backend=<id>` answered with `{"voices": [...]}`
//! - `POST /cancel` with `{"backend": <id>}`, best-effort
//!
//! The client never retries; the player decides what to do with failures.

#![deny(unsafe_code)]
// DefaultTtsClient is meant to be used through the SynthesisPort trait, not
// its internal generic structure
#![allow(private_interfaces, private_bounds)]

mod client;
mod config;
mod error;
mod http;
mod models;
mod port;

// ============================================================================
// Public API
// ============================================================================

// Client
pub use client::DefaultTtsClient;

// Configuration
pub use config::{DEFAULT_BASE_URL, TtsClientConfig};

// Errors
pub use error::{TtsError, TtsResult};

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;
