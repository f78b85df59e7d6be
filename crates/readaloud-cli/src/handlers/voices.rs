//! `--list-voices` handler.

use anyhow::Result;
use readaloud_core::Backend;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::voice_lines;

/// Print the voices of `backend`, or of the stored backend when `None`.
///
/// Falls back to the backend's built-in list when the server cannot answer.
pub async fn execute(ctx: &CliContext, backend: Option<Backend>) -> Result<()> {
    let prefs = ctx.preferences.load().await.map_err(CliError::from)?;
    let backend = backend.unwrap_or(prefs.backend);

    let voices = match ctx.synthesis.list_voices(backend).await {
        Ok(voices) if !voices.is_empty() => voices,
        Ok(_) => {
            println!("Server listed no voices for {backend}; showing built-in voices.");
            builtin(backend)
        }
        Err(e) => {
            println!("Could not reach {} ({e}); showing built-in voices.", ctx.config.server);
            builtin(backend)
        }
    };

    println!("Voices for {backend}:");
    for line in voice_lines(&voices, &prefs.voice, &prefs.voice_ratings) {
        println!("{line}");
    }
    Ok(())
}

fn builtin(backend: Backend) -> Vec<String> {
    backend
        .fallback_voices()
        .iter()
        .map(ToString::to_string)
        .collect()
}
