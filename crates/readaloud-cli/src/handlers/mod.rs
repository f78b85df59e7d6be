//! Command handlers.
//!
//! Handlers follow the pattern `pub async fn execute(ctx: &CliContext, ...) -> Result<()>`:
//! they validate CLI input, call into the session or ports, and format output
//! for the terminal. Playback logic stays in readaloud-voice.

pub mod read;
pub mod voices;
