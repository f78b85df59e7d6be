//! Command-line reader for readaloud.
//!
//! `readaloud <file>` segments a text or markdown file, plays it through the
//! local TTS server and accepts line commands on stdin while it reads.

#![deny(unsafe_code)]

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;

// Used by the binary only
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod prefs_store;
pub mod presentation;

// Re-export primary types for convenient access
pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::{ReaderCommand, parse_command};
pub use error::CliError;
pub use parser::Cli;
pub use prefs_store::JsonPreferenceStore;
pub use presentation::ConsoleSink;
