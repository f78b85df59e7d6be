//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the CLI adapter:
//! - TTS HTTP client (via readaloud-tts)
//! - Preference store (JSON file, or in-memory with `--no-persist`)
//! - Console position sink
//!
//! The audio device is opened later by the read handler, so commands that
//! never play audio work on machines without one.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use readaloud_core::{MemoryPreferenceStore, PreferenceStore, SynthesisPort, preferences_path};
use readaloud_tts::{DefaultTtsClient, TtsClientConfig};
use readaloud_voice::{AudioOutput, SessionPorts};

use crate::parser::Cli;
use crate::prefs_store::JsonPreferenceStore;
use crate::presentation::ConsoleSink;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Root URL of the TTS server.
    pub server: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Preferences file; `None` keeps preferences in memory only.
    pub prefs_path: Option<PathBuf>,
}

impl CliConfig {
    /// Resolve configuration from parsed arguments.
    ///
    /// Without `--prefs`, preferences live under the readaloud config
    /// directory (`READALOUD_CONFIG_DIR` overrides it).
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let prefs_path = if cli.no_persist {
            None
        } else if let Some(path) = &cli.prefs {
            Some(path.clone())
        } else {
            Some(preferences_path().context("Failed to resolve the preferences path")?)
        };

        Ok(Self {
            server: cli.server.clone(),
            timeout: Duration::from_secs(cli.timeout),
            prefs_path,
        })
    }
}

/// Fully composed application context for CLI commands.
pub struct CliContext {
    pub config: CliConfig,
    pub synthesis: Arc<dyn SynthesisPort>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub sink: Arc<ConsoleSink>,
}

impl CliContext {
    /// Session wiring around an already opened audio output.
    pub fn session_ports(&self, output: Arc<dyn AudioOutput>) -> SessionPorts {
        SessionPorts {
            synthesis: Arc::clone(&self.synthesis),
            output,
            sink: Arc::clone(&self.sink) as _,
            preferences: Arc::clone(&self.preferences),
        }
    }
}

/// Bootstrap the CLI context with all dependencies wired.
pub fn bootstrap(config: CliConfig) -> Result<CliContext> {
    let tts_config = TtsClientConfig::new()
        .with_base_url(config.server.clone())
        .with_timeout(config.timeout);
    let client = DefaultTtsClient::new(tts_config)
        .with_context(|| format!("Invalid TTS server address '{}'", config.server))?;

    let preferences: Arc<dyn PreferenceStore> = match &config.prefs_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Using preferences file");
            Arc::new(JsonPreferenceStore::new(path))
        }
        None => Arc::new(MemoryPreferenceStore::default()),
    };

    Ok(CliContext {
        config,
        synthesis: Arc::new(client),
        preferences,
        sink: Arc::new(ConsoleSink::new()),
    })
}
