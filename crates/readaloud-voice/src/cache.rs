//! Decoded-audio cache with request coalescing.
//!
//! Entries are keyed by the playback configuration signature and segment
//! index. The cache only ever holds entries for the current signature: asking
//! for a different one drops everything, including in-flight requests.
//!
//! Each missing entry is fetched by exactly one spawned task (gate ticket →
//! synthesis → decode). Concurrent callers for the same key share that
//! task's result through a [`Shared`] future, and failures are never cached.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture, Shared};
use readaloud_core::{ConfigSignature, PlaybackConfig, SynthesisError, SynthesisPort};
use tokio::task::AbortHandle;

use crate::decode::{DecodedAudio, decode_audio_async};
use crate::error::SegmentError;
use crate::gate::SynthesisGate;

/// Result shared by every waiter on one segment.
pub type FetchResult = Result<Arc<DecodedAudio>, SegmentError>;

/// Future resolving to a segment's decoded audio.
pub type SegmentFetch = Shared<BoxFuture<'static, FetchResult>>;

/// Identity of a cached segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub signature: ConfigSignature,
    pub index: usize,
}

struct InFlight {
    id: u64,
    fetch: SegmentFetch,
    abort: AbortHandle,
}

#[derive(Default)]
struct CacheState {
    signature: Option<ConfigSignature>,
    entries: HashMap<CacheKey, Arc<DecodedAudio>>,
    in_flight: HashMap<CacheKey, InFlight>,
    next_id: u64,
}

impl CacheState {
    /// Unregister matching in-flight requests. The caller aborts the returned
    /// handles after releasing the lock.
    fn take_where(&mut self, mut pred: impl FnMut(&CacheKey) -> bool) -> Vec<AbortHandle> {
        let doomed: Vec<CacheKey> = self.in_flight.keys().filter(|k| pred(k)).cloned().collect();
        doomed
            .iter()
            .filter_map(|key| self.in_flight.remove(key))
            .map(|flight| flight.abort)
            .collect()
    }

    fn reset(&mut self, signature: Option<ConfigSignature>) -> Vec<AbortHandle> {
        self.entries.clear();
        self.signature = signature;
        self.take_where(|_| true)
    }
}

fn abort_all(handles: Vec<AbortHandle>) -> usize {
    for handle in &handles {
        handle.abort();
    }
    handles.len()
}

struct CacheInner {
    synthesis: Arc<dyn SynthesisPort>,
    gate: SynthesisGate,
    state: Mutex<CacheState>,
}

impl CacheInner {
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn forget(&self, key: &CacheKey, id: u64) {
        let mut state = self.lock();
        if state.in_flight.get(key).is_some_and(|f| f.id == id) {
            state.in_flight.remove(key);
        }
    }

    fn complete(&self, key: &CacheKey, id: u64, result: &FetchResult) {
        let mut state = self.lock();
        if state.in_flight.get(key).is_some_and(|f| f.id == id) {
            state.in_flight.remove(key);
        }
        if let Ok(audio) = result {
            if state.signature.as_ref() == Some(&key.signature) {
                state.entries.insert(key.clone(), Arc::clone(audio));
            }
        }
    }
}

/// Removes a fetch task's in-flight marker however the task ends
/// (completion, abort or panic).
struct FlightGuard {
    inner: Arc<CacheInner>,
    key: CacheKey,
    id: u64,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.inner.forget(&self.key, self.id);
    }
}

/// Segment audio cache shared by the scheduler and its fetch tasks.
#[derive(Clone)]
pub struct DecodeCache {
    inner: Arc<CacheInner>,
}

impl std::fmt::Debug for DecodeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("DecodeCache")
            .field("signature", &state.signature)
            .field("entries", &state.entries.len())
            .field("in_flight", &state.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl DecodeCache {
    #[must_use]
    pub fn new(synthesis: Arc<dyn SynthesisPort>, gate: SynthesisGate) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                synthesis,
                gate,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    /// Audio for segment `index` under `config`.
    ///
    /// Returns immediately with a cached entry, joins an in-flight request
    /// for the same key, or starts a new one. Must be called from within a
    /// Tokio runtime.
    pub fn get_or_fetch(&self, config: &PlaybackConfig, index: usize, text: &str) -> SegmentFetch {
        let key = CacheKey {
            signature: config.signature(),
            index,
        };
        let mut state = self.inner.lock();

        if state.signature.as_ref() != Some(&key.signature) {
            let stale = state.reset(Some(key.signature.clone()));
            drop(state);
            let aborted = abort_all(stale);
            tracing::debug!(signature = %key.signature, aborted, "Cache signature changed");
            state = self.inner.lock();
        }
        if let Some(audio) = state.entries.get(&key) {
            let audio = Arc::clone(audio);
            return future::ready(Ok(audio)).boxed().shared();
        }
        if let Some(flight) = state.in_flight.get(&key) {
            return flight.fetch.clone();
        }

        let id = state.next_id;
        state.next_id += 1;

        // Reserve the gate slot now so requests keep their issue order.
        let ticket = self.inner.gate.ticket();
        let inner = Arc::clone(&self.inner);
        let config = config.clone();
        let text = text.to_string();
        let task_key = key.clone();

        let task = tokio::spawn(async move {
            let _guard = FlightGuard {
                inner: Arc::clone(&inner),
                key: task_key.clone(),
                id,
            };
            let result: FetchResult = async {
                let bytes = ticket
                    .run(inner.synthesis.synthesize(&text, &config))
                    .await
                    .map_err(|e| match e {
                        SynthesisError::Cancelled => SegmentError::Cancelled,
                        other => SegmentError::Synthesis(other),
                    })?;
                Ok(decode_audio_async(bytes).await?)
            }
            .await;
            inner.complete(&task_key, id, &result);
            result
        });
        let abort = task.abort_handle();
        let fetch: SegmentFetch = async move {
            match task.await {
                Ok(result) => result,
                Err(e) if e.is_panic() => {
                    tracing::error!(index, "Segment fetch task panicked");
                    Err(SegmentError::Worker("synthesis task panicked".into()))
                }
                Err(_) => Err(SegmentError::Cancelled),
            }
        }
        .boxed()
        .shared();

        tracing::trace!(index, "Segment fetch started");
        state.in_flight.insert(
            key,
            InFlight {
                id,
                fetch: fetch.clone(),
                abort,
            },
        );
        fetch
    }

    /// Drop cached entries outside `center - keep_behind ..= center + prefetch_ahead`.
    pub fn retain_window(&self, center: usize, keep_behind: usize, prefetch_ahead: usize) {
        let (lo, hi) = window(center, keep_behind, prefetch_ahead);
        let mut state = self.inner.lock();
        let before = state.entries.len();
        state.entries.retain(|key, _| (lo..=hi).contains(&key.index));
        let evicted = before - state.entries.len();
        if evicted > 0 {
            tracing::trace!(center, evicted, "Evicted cached segments");
        }
    }

    /// Abort in-flight requests outside the window. Returns how many were aborted.
    pub fn cancel_outside(&self, center: usize, keep_behind: usize, prefetch_ahead: usize) -> usize {
        let (lo, hi) = window(center, keep_behind, prefetch_ahead);
        let doomed = self
            .inner
            .lock()
            .take_where(|key| !(lo..=hi).contains(&key.index));
        abort_all(doomed)
    }

    /// Abort every in-flight request. Returns how many were aborted.
    pub fn cancel_in_flight(&self) -> usize {
        let doomed = self.inner.lock().take_where(|_| true);
        abort_all(doomed)
    }

    /// Drop everything and adopt `signature`.
    pub fn reset(&self, signature: ConfigSignature) -> usize {
        let doomed = self.inner.lock().reset(Some(signature));
        abort_all(doomed)
    }

    /// Indices with decoded audio for the current signature, ascending.
    #[must_use]
    pub fn cached_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.inner.lock().entries.keys().map(|k| k.index).collect();
        indices.sort_unstable();
        indices
    }

    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.inner.lock().in_flight.len()
    }

    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    #[must_use]
    pub fn signature(&self) -> Option<ConfigSignature> {
        self.inner.lock().signature.clone()
    }
}

fn window(center: usize, keep_behind: usize, prefetch_ahead: usize) -> (usize, usize) {
    (
        center.saturating_sub(keep_behind),
        center.saturating_add(prefetch_ahead),
    )
}
