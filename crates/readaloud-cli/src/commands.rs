//! Interactive reader commands.
//!
//! While a document is being read, each line on stdin is one command. Segment
//! numbers typed by the user are 1-based; [`ReaderCommand::Goto`] carries the
//! zero-based index the player expects.

use readaloud_core::Backend;

use crate::error::CliError;

/// One line of user input, parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderCommand {
    /// Start or resume at the current segment.
    Play,
    Pause,
    Stop,
    Next,
    Prev,
    NextParagraph,
    PrevParagraph,
    /// Jump to a zero-based segment index.
    Goto(usize),
    Voice(String),
    Speed(f32),
    Backend(Backend),
    /// List voices of the given backend, or the current one.
    Voices(Option<Backend>),
    Rate { voice: String, stars: u8 },
    Status,
    Help,
    Quit,
}

/// Text printed by the `help` command.
pub const HELP: &str = "\
Commands:
  p, play            start or resume
  pause              pause at the current segment
  x, stop            stop
  n, next            next segment
  b, back            previous segment
  ], np              next paragraph
  [, pp              previous paragraph (start of this one first)
  g, goto N          jump to segment N
  v, voice ID        change voice
  s, speed X         change speed (0.5 to 2.0)
  backend NAME       switch backend (kokoro, piper, coqui)
  voices [NAME]      list voices
  rate ID STARS      rate a voice from 1 to 5
  ?, status          show the current position
  h, help            show this help
  q, quit            save position and exit";

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<ReaderCommand>, CliError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let command = match verb.to_ascii_lowercase().as_str() {
        "p" | "play" => ReaderCommand::Play,
        "pause" => ReaderCommand::Pause,
        "x" | "stop" => ReaderCommand::Stop,
        "n" | "next" => ReaderCommand::Next,
        "b" | "back" | "prev" => ReaderCommand::Prev,
        "]" | "np" => ReaderCommand::NextParagraph,
        "[" | "pp" => ReaderCommand::PrevParagraph,
        "g" | "goto" => ReaderCommand::Goto(segment_number(single(verb, &rest)?)?),
        "v" | "voice" => ReaderCommand::Voice(single(verb, &rest)?.to_string()),
        "s" | "speed" => {
            let raw = single(verb, &rest)?;
            let speed = raw
                .parse::<f32>()
                .ok()
                .filter(|s| s.is_finite())
                .ok_or_else(|| CliError::Arguments(format!("'{raw}' is not a speed")))?;
            ReaderCommand::Speed(speed)
        }
        "backend" => ReaderCommand::Backend(backend(single(verb, &rest)?)?),
        "voices" => match rest.as_slice() {
            [] => ReaderCommand::Voices(None),
            [name] => ReaderCommand::Voices(Some(backend(name)?)),
            _ => return Err(usage(verb)),
        },
        "rate" => match rest.as_slice() {
            [voice, stars] => ReaderCommand::Rate {
                voice: (*voice).to_string(),
                stars: stars
                    .parse()
                    .map_err(|_| CliError::Arguments(format!("'{stars}' is not a star count")))?,
            },
            _ => return Err(usage(verb)),
        },
        "?" | "status" => ReaderCommand::Status,
        "h" | "help" => ReaderCommand::Help,
        "q" | "quit" | "exit" => ReaderCommand::Quit,
        other => {
            return Err(CliError::Arguments(format!(
                "Unknown command '{other}' (type 'help')"
            )));
        }
    };
    Ok(Some(command))
}

fn single<'a>(verb: &str, rest: &[&'a str]) -> Result<&'a str, CliError> {
    match rest {
        &[arg] => Ok(arg),
        _ => Err(usage(verb)),
    }
}

fn usage(verb: &str) -> CliError {
    CliError::Arguments(format!("Wrong arguments for '{verb}' (type 'help')"))
}

fn segment_number(raw: &str) -> Result<usize, CliError> {
    match raw.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(CliError::Arguments(format!(
            "'{raw}' is not a segment number"
        ))),
    }
}

fn backend(raw: &str) -> Result<Backend, CliError> {
    raw.parse()
        .map_err(|e: readaloud_core::UnknownBackend| CliError::Arguments(e.to_string()))
}
