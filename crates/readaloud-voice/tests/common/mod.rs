//! Shared test doubles for the player integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use readaloud_core::{
    Backend, PlaybackConfig, PlayerStatus, PositionSink, Segmentation, SourceRange,
    SynthesisError, SynthesisPort,
};
use readaloud_voice::{AudioOutput, DecodedAudio, OutputError, PlaybackDone};
use tokio::sync::Semaphore;

// ── Audio fixtures ─────────────────────────────────────────────────

/// 20 ms of mono 8 kHz 16-bit PCM, every sample equal to `value`.
pub fn wav_bytes(value: i16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..160 {
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Which [`MockSynth`] call produced `audio` (0-based).
pub fn call_id(audio: &DecodedAudio) -> usize {
    let value = (audio.samples[0] * 32768.0).round();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let value = value as usize;
    value - 1
}

/// One segment per container.
pub fn segments(texts: &[&str]) -> Segmentation {
    let containers: Vec<usize> = (0..texts.len()).collect();
    segments_in(texts, &containers)
}

/// Segments with explicit container handles.
pub fn segments_in(texts: &[&str], containers: &[usize]) -> Segmentation {
    let mut seg = Segmentation::new();
    for (text, &container) in texts.iter().zip(containers) {
        seg.push(*text, SourceRange::new(container, 0, text.chars().count()));
    }
    seg
}

// ── Mock synthesis ─────────────────────────────────────────────────

/// Recorded synthesis request.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthCall {
    pub text: String,
    pub config: PlaybackConfig,
}

/// Synthesis service double.
///
/// Every call is recorded on entry, then waits for a permit. `open()` hands
/// out permits freely; `held()` starts with none so the test releases calls
/// one by one with [`MockSynth::release`].
pub struct MockSynth {
    calls: Mutex<Vec<SynthCall>>,
    failing: Mutex<HashSet<String>>,
    panicking: Mutex<HashSet<String>>,
    /// Remaining calls per text that answer `Cancelled`.
    cancelled: Mutex<HashMap<String, usize>>,
    voices: Mutex<Result<Vec<String>, SynthesisError>>,
    permits: Semaphore,
    active: AtomicUsize,
    peak: AtomicUsize,
    cancels: AtomicUsize,
}

impl MockSynth {
    fn with_permits(permits: usize) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            panicking: Mutex::new(HashSet::new()),
            cancelled: Mutex::new(HashMap::new()),
            voices: Mutex::new(Ok(Vec::new())),
            permits: Semaphore::new(permits),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            cancels: AtomicUsize::new(0),
        })
    }

    pub fn open() -> Arc<Self> {
        Self::with_permits(Semaphore::MAX_PERMITS)
    }

    pub fn held() -> Arc<Self> {
        Self::with_permits(0)
    }

    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }

    pub fn fail_on(&self, text: &str) {
        self.failing.lock().unwrap().insert(text.to_string());
    }

    /// Make every synthesis of `text` panic.
    pub fn panic_on(&self, text: &str) {
        self.panicking.lock().unwrap().insert(text.to_string());
    }

    /// Answer the next `times` syntheses of `text` with `Cancelled`.
    pub fn cancel_next(&self, text: &str, times: usize) {
        self.cancelled.lock().unwrap().insert(text.to_string(), times);
    }

    pub fn set_voices(&self, voices: Result<Vec<String>, SynthesisError>) {
        *self.voices.lock().unwrap() = voices;
    }

    pub fn calls(&self) -> Vec<SynthCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.text).collect()
    }

    /// Highest number of calls ever running at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SynthesisPort for MockSynth {
    async fn synthesize(
        &self,
        text: &str,
        config: &PlaybackConfig,
    ) -> Result<Vec<u8>, SynthesisError> {
        let call_no = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(SynthCall {
                text: text.to_string(),
                config: config.clone(),
            });
            calls.len()
        };
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = ActiveGuard(&self.active);
        self.peak.fetch_max(now, Ordering::SeqCst);

        self.permits.acquire().await.unwrap().forget();

        let boom = self.panicking.lock().unwrap().contains(text);
        assert!(!boom, "synthesizer crashed on {text:?}");

        let cancel = match self.cancelled.lock().unwrap().get_mut(text) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        };
        if cancel {
            return Err(SynthesisError::Cancelled);
        }

        if self.failing.lock().unwrap().contains(text) {
            return Err(SynthesisError::Backend {
                status: 500,
                reason: format!("cannot say {text:?}"),
            });
        }
        Ok(wav_bytes(i16::try_from(call_no).unwrap()))
    }

    async fn list_voices(&self, _backend: Backend) -> Result<Vec<String>, SynthesisError> {
        self.voices.lock().unwrap().clone()
    }

    async fn cancel(&self, _backend: Backend) -> Result<(), SynthesisError> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ── Mock output ────────────────────────────────────────────────────

#[derive(Default)]
struct OutputState {
    generation: u64,
    pending: Option<PlaybackDone>,
    plays: usize,
    stops: usize,
    fail: bool,
}

/// Audio output double.
///
/// With `auto_finish`, each play completes on its own after the delay unless
/// stopped or replaced first; otherwise the test calls [`MockOutput::finish`].
pub struct MockOutput {
    auto_finish: Option<Duration>,
    state: Arc<Mutex<OutputState>>,
}

impl MockOutput {
    pub fn manual() -> Arc<Self> {
        Arc::new(Self {
            auto_finish: None,
            state: Arc::new(Mutex::new(OutputState::default())),
        })
    }

    pub fn auto(after: Duration) -> Arc<Self> {
        Arc::new(Self {
            auto_finish: Some(after),
            state: Arc::new(Mutex::new(OutputState::default())),
        })
    }

    /// Complete the current playback naturally. Returns whether one was pending.
    pub fn finish(&self) -> bool {
        let done = self.state.lock().unwrap().pending.take();
        done.map(|done| done()).is_some()
    }

    pub fn plays(&self) -> usize {
        self.state.lock().unwrap().plays
    }

    pub fn stops(&self) -> usize {
        self.state.lock().unwrap().stops
    }

    pub fn fail_next(&self) {
        self.state.lock().unwrap().fail = true;
    }
}

impl AudioOutput for MockOutput {
    fn play(&self, _audio: Arc<DecodedAudio>, on_done: PlaybackDone) -> Result<(), OutputError> {
        let mut state = self.state.lock().unwrap();
        if std::mem::take(&mut state.fail) {
            return Err(OutputError::OutputStream("device unplugged".into()));
        }
        state.generation += 1;
        state.plays += 1;
        state.pending = Some(on_done);

        if let Some(after) = self.auto_finish {
            let generation = state.generation;
            let shared = Arc::clone(&self.state);
            tokio::spawn(async move {
                tokio::time::sleep(after).await;
                let done = {
                    let mut state = shared.lock().unwrap();
                    if state.generation == generation {
                        state.pending.take()
                    } else {
                        None
                    }
                };
                if let Some(done) = done {
                    done();
                }
            });
        }
        Ok(())
    }

    fn stop(&self) {
        let mut state = self.state.lock().unwrap();
        state.generation += 1;
        state.pending = None;
        state.stops += 1;
    }

    fn is_playing(&self) -> bool {
        self.state.lock().unwrap().pending.is_some()
    }
}

// ── Recording sink ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Position(usize),
    Status(PlayerStatus),
    Started(usize),
    Finished,
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Started(i) => Some(i),
                _ => None,
            })
            .collect()
    }

    pub fn positions(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Position(i) => Some(i),
                _ => None,
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<PlayerStatus> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Status(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    /// Indices reported as failed, in order.
    pub fn failures(&self) -> Vec<usize> {
        self.statuses()
            .into_iter()
            .filter_map(|s| match s {
                PlayerStatus::SegmentFailed { index, .. } => Some(index),
                _ => None,
            })
            .collect()
    }

    pub fn finished(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| **e == SinkEvent::Finished)
            .count()
    }

    fn push(&self, event: SinkEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl PositionSink for RecordingSink {
    fn on_position_changed(&self, index: usize) {
        self.push(SinkEvent::Position(index));
    }

    fn on_status_changed(&self, status: &PlayerStatus) {
        self.push(SinkEvent::Status(status.clone()));
    }

    fn on_segment_started(&self, index: usize) {
        self.push(SinkEvent::Started(index));
    }

    fn on_finished(&self) {
        self.push(SinkEvent::Finished);
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Poll `cond` until it holds, failing the test after a few seconds.
pub async fn eventually(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}
