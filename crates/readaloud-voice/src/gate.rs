//! Single-flight gate for synthesis requests.
//!
//! The TTS service renders one request at a time, so every request the
//! player issues goes through one [`SynthesisGate`]. Tickets are handed out
//! synchronously in the order requests are made and served strictly in that
//! order, which keeps the foreground segment ahead of its prefetches.
//!
//! A ticket releases its place when dropped, whether its operation
//! succeeded, failed or was aborted before it ever ran.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

#[derive(Debug)]
struct GateInner {
    queue: Mutex<VecDeque<u64>>,
    next_id: AtomicU64,
    /// Ticket currently allowed to run.
    front: watch::Sender<Option<u64>>,
}

impl GateInner {
    fn publish_front(&self, queue: &VecDeque<u64>) {
        self.front.send_replace(queue.front().copied());
    }
}

/// FIFO mutual exclusion over asynchronous operations.
#[derive(Debug, Clone)]
pub struct SynthesisGate {
    inner: Arc<GateInner>,
}

impl Default for SynthesisGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SynthesisGate {
    #[must_use]
    pub fn new() -> Self {
        let (front, _) = watch::channel(None);
        Self {
            inner: Arc::new(GateInner {
                queue: Mutex::new(VecDeque::new()),
                next_id: AtomicU64::new(0),
                front,
            }),
        }
    }

    /// Reserve the next place in line.
    #[must_use]
    pub fn ticket(&self) -> GateTicket {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let rx = self.inner.front.subscribe();
        {
            let mut queue = self
                .inner
                .queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            queue.push_back(id);
            self.inner.publish_front(&queue);
        }
        GateTicket {
            id,
            gate: Arc::clone(&self.inner),
            rx,
        }
    }

    /// Take a ticket and run `op` once it reaches the front.
    pub async fn run<F, T>(&self, op: F) -> T
    where
        F: Future<Output = T>,
    {
        self.ticket().run(op).await
    }

    /// Tickets waiting or running.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.inner
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A reserved place in the gate's queue.
#[derive(Debug)]
pub struct GateTicket {
    id: u64,
    gate: Arc<GateInner>,
    rx: watch::Receiver<Option<u64>>,
}

impl GateTicket {
    /// Wait for this ticket's turn, run `op`, then release the gate.
    pub async fn run<F, T>(mut self, op: F) -> T
    where
        F: Future<Output = T>,
    {
        let id = self.id;
        // The sender lives in `self.gate`, so the channel cannot close here.
        let _ = self.rx.wait_for(|front| *front == Some(id)).await;
        op.await
    }
}

impl Drop for GateTicket {
    fn drop(&mut self) {
        let mut queue = self
            .gate
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        queue.retain(|&id| id != self.id);
        self.gate.publish_front(&queue);
    }
}
