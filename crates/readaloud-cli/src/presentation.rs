//! Terminal output: the console position sink and list formatting.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use readaloud_core::{PlayerStatus, PositionSink};
use tokio::sync::Notify;

/// Prints player events to the terminal.
///
/// Segment texts are attached once the session has segmented the document,
/// so the sink can be handed to the session before segmentation happens.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    texts: OnceLock<Vec<String>>,
    finished: Notify,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provide the segment texts shown when each segment starts. Only the
    /// first call has an effect.
    pub fn attach_texts(&self, texts: Vec<String>) {
        let _ = self.texts.set(texts);
    }

    /// Resolves after the player reports the end of the document.
    pub async fn wait_finished(&self) {
        self.finished.notified().await;
    }

    fn total(&self) -> usize {
        self.texts.get().map_or(0, Vec::len)
    }
}

impl PositionSink for ConsoleSink {
    fn on_position_changed(&self, index: usize) {
        tracing::debug!(index, "Position changed");
    }

    fn on_status_changed(&self, status: &PlayerStatus) {
        match status {
            // Playing is shown by on_segment_started together with the text.
            PlayerStatus::Loading { .. } | PlayerStatus::Playing { .. } => {
                tracing::debug!(status = status.label(), "{status}");
            }
            s if s.is_error() => eprintln!("! {s}"),
            s => println!("[{s}]"),
        }
    }

    fn on_segment_started(&self, index: usize) {
        let text = self
            .texts
            .get()
            .and_then(|texts| texts.get(index))
            .map_or("", String::as_str);
        println!("{}", segment_line(index, self.total(), text));
    }

    fn on_finished(&self) {
        self.finished.notify_one();
    }
}

/// `(3/12) Text of the segment` with a 1-based position.
pub fn segment_line(index: usize, total: usize, text: &str) -> String {
    format!("({}/{total}) {text}", index + 1)
}

/// One voice per line. The current voice is starred and ratings are shown.
pub fn voice_lines(voices: &[String], current: &str, ratings: &BTreeMap<String, u8>) -> Vec<String> {
    voices
        .iter()
        .map(|voice| {
            let marker = if voice == current { '*' } else { ' ' };
            match ratings.get(voice) {
                Some(&stars) => format!("{marker} {voice} ({stars}/5)"),
                None => format!("{marker} {voice}"),
            }
        })
        .collect()
}
