//! Read command handler.
//!
//! Opens a reader session for one file, applies voice overrides from the
//! command line, starts playback and then serves interactive commands from
//! stdin until the user quits or the document ends.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use readaloud_core::Backend;
use readaloud_voice::{Document, LocalAudioOutput, ReaderSession, SessionOptions};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::bootstrap::CliContext;
use crate::commands::{HELP, ReaderCommand, parse_command};
use crate::error::CliError;
use crate::presentation::{ConsoleSink, segment_line, voice_lines};

/// How often the player is checked once stdin has closed.
const HALT_POLL: Duration = Duration::from_millis(250);

/// What to read and how.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub file: PathBuf,
    /// Never interpret the file as markdown.
    pub plain: bool,
    /// Zero-based segment to start from, overriding stored progress.
    pub start: Option<usize>,
    pub backend: Option<Backend>,
    pub voice: Option<String>,
    pub speed: Option<f32>,
}

/// Execute the read command.
pub async fn execute(ctx: &CliContext, options: ReadOptions) -> Result<()> {
    let text = tokio::fs::read_to_string(&options.file)
        .await
        .map_err(CliError::from)
        .with_context(|| format!("Failed to read {}", options.file.display()))?;
    let document = load_document(&options.file, &text, options.plain);
    let page = page_key(&options.file);

    let output = LocalAudioOutput::open().map_err(CliError::from)?;
    let session = ReaderSession::open(
        page,
        &document,
        ctx.session_ports(Arc::new(output)),
        SessionOptions::default(),
    )
    .await
    .map_err(CliError::from)?;

    let texts = (0..session.total())
        .filter_map(|i| session.segment_text(i).map(ToString::to_string))
        .collect();
    ctx.sink.attach_texts(texts);

    if let Err(e) = apply_overrides(&session, &options).await {
        session.close().await.map_err(CliError::from)?;
        return Err(e.into());
    }

    println!(
        "Reading {} ({} segments). Type 'help' for commands.",
        options.file.display(),
        session.total()
    );
    if let Err(e) = session.play(options.start).await {
        eprintln!("! {e}");
    }

    interact(&ctx.sink, &session, BufReader::new(tokio::io::stdin())).await?;

    session.close().await.map_err(CliError::from)?;
    Ok(())
}

async fn apply_overrides(session: &ReaderSession, options: &ReadOptions) -> Result<(), CliError> {
    if let Some(backend) = options.backend {
        session.set_backend(backend).await?;
    }
    if let Some(voice) = &options.voice {
        session.set_voice(voice).await?;
    }
    if let Some(speed) = options.speed {
        session.set_speed(speed).await?;
    }
    Ok(())
}

/// Serve input commands until `quit`. Once input has closed, return when
/// the player stops: at the end of the document or when playback halts.
async fn interact<R>(sink: &ConsoleSink, session: &ReaderSession, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line.context("Failed to read user input")? else {
                    tracing::debug!("stdin closed, reading to the end");
                    stdin_open = false;
                    if !is_playing(session).await? {
                        break;
                    }
                    continue;
                };
                match parse_command(&line) {
                    Ok(None) => {}
                    Ok(Some(ReaderCommand::Quit)) => break,
                    Ok(Some(command)) => {
                        if let Err(e) = dispatch(session, command).await {
                            eprintln!("! {e}");
                        }
                    }
                    Err(e) => eprintln!("! {e}"),
                }
            }
            () = sink.wait_finished(), if !stdin_open => break,
            () = tokio::time::sleep(HALT_POLL), if !stdin_open => {
                if !is_playing(session).await? {
                    tracing::debug!("Playback halted with stdin closed");
                    break;
                }
            }
        }
    }
    Ok(())
}

async fn is_playing(session: &ReaderSession) -> Result<bool, CliError> {
    Ok(session.snapshot().await?.playing)
}

async fn dispatch(session: &ReaderSession, command: ReaderCommand) -> Result<(), CliError> {
    match command {
        ReaderCommand::Play => {
            session.play(None).await?;
        }
        ReaderCommand::Pause => {
            session.pause().await?;
        }
        ReaderCommand::Stop => {
            session.stop().await?;
        }
        ReaderCommand::Next => {
            session.next_segment().await?;
        }
        ReaderCommand::Prev => {
            session.prev_segment().await?;
        }
        ReaderCommand::NextParagraph => {
            session.next_paragraph().await?;
        }
        ReaderCommand::PrevParagraph => {
            session.prev_paragraph().await?;
        }
        ReaderCommand::Goto(index) => {
            session.seek(index).await?;
        }
        ReaderCommand::Voice(voice) => {
            let snapshot = session.set_voice(&voice).await?;
            println!("Voice: {}", snapshot.config.voice);
        }
        ReaderCommand::Speed(speed) => {
            let snapshot = session.set_speed(speed).await?;
            println!("Speed: {}", snapshot.config.speed);
        }
        ReaderCommand::Backend(backend) => {
            let snapshot = session.set_backend(backend).await?;
            println!("Backend: {} ({})", snapshot.config.backend, snapshot.config.voice);
        }
        ReaderCommand::Voices(backend) => {
            let current = session.snapshot().await?.config;
            let backend = backend.unwrap_or(current.backend);
            let voices = session.voices(backend).await?;
            let ratings = session.preferences().voice_ratings;
            println!("Voices for {backend}:");
            for line in voice_lines(&voices, &current.voice, &ratings) {
                println!("{line}");
            }
        }
        ReaderCommand::Rate { voice, stars } => {
            session.rate_voice(&voice, stars).await?;
            println!("Rated {voice} {stars}/5");
        }
        ReaderCommand::Status => {
            let snapshot = session.snapshot().await?;
            println!("{} [{}]", snapshot.status, snapshot.config.signature());
            if let Some(text) = session.segment_text(snapshot.index) {
                println!("{}", segment_line(snapshot.index, snapshot.total, text));
            }
        }
        ReaderCommand::Help => println!("{HELP}"),
        // Handled by the input loop.
        ReaderCommand::Quit => {}
    }
    Ok(())
}

/// Build the document, treating `.md`/`.markdown` files as markdown.
pub fn load_document(path: &Path, text: &str, plain: bool) -> Document {
    let markdown = !plain
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown"));

    if markdown {
        Document::from_markdown(text)
    } else {
        Document::from_plain_text(text)
    }
}

/// Progress key for a file: its canonical path when it can be resolved.
pub fn page_key(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
