//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;
use readaloud_core::Backend;
use readaloud_tts::DEFAULT_BASE_URL;

/// Command-line interface for reading a document aloud.
///
/// Voice settings given here override the stored preferences and are saved
/// as the new defaults.
#[derive(Debug, Parser)]
#[command(name = "readaloud")]
#[command(about = "Read a text or markdown file aloud through a local TTS server")]
#[command(version)]
pub struct Cli {
    /// Text or markdown file to read
    #[arg(required_unless_present = "list_voices")]
    pub file: Option<PathBuf>,

    /// Root URL of the TTS server
    #[arg(long, env = "READALOUD_SERVER", default_value = DEFAULT_BASE_URL)]
    pub server: String,

    /// Synthesis backend (kokoro, piper, coqui)
    #[arg(short, long, env = "READALOUD_BACKEND")]
    pub backend: Option<Backend>,

    /// Voice id for the selected backend
    #[arg(long, env = "READALOUD_VOICE")]
    pub voice: Option<String>,

    /// Speech rate (0.5 to 2.0)
    #[arg(short, long, env = "READALOUD_SPEED")]
    pub speed: Option<f32>,

    /// Start at this segment number (1-based) instead of the stored position
    #[arg(long, value_parser = segment_number)]
    pub start: Option<usize>,

    /// Treat the file as plain text even if it looks like markdown
    #[arg(long)]
    pub plain: bool,

    /// Print the voices of the selected backend and exit
    #[arg(long)]
    pub list_voices: bool,

    /// Preferences file (defaults to the readaloud config directory)
    #[arg(long, value_name = "PATH")]
    pub prefs: Option<PathBuf>,

    /// Do not read or write stored preferences
    #[arg(long, conflicts_with = "prefs")]
    pub no_persist: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

fn segment_number(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(format!("'{raw}' is not a segment number (counting starts at 1)")),
    }
}
