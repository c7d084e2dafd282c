//! Bounded outbound chunk queue between capture and transmission.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

/// FIFO of wire-ready chunks, bounded with drop-oldest overflow.
///
/// The capture thread pushes, the async send loop pops. When the network
/// falls behind and the queue fills, the oldest chunk is discarded so the
/// stream stays near real time; drops are counted for diagnostics.
pub struct OutboundQueue {
    inner: Mutex<VecDeque<Vec<u8>>>,
    notify: Notify,
    capacity: usize,
    dropped: AtomicU64,
}

impl OutboundQueue {
    /// Create a queue holding at most `capacity` chunks.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueue a chunk, discarding the oldest one if the queue is full.
    ///
    /// Never blocks: safe to call from the capture thread.
    pub fn push(&self, chunk: Vec<u8>) {
        {
            let mut inner = match self.inner.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if inner.len() >= self.capacity {
                inner.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            inner.push_back(chunk);
        }
        self.notify.notify_one();
    }

    /// Dequeue the oldest chunk without waiting.
    pub fn try_pop(&self) -> Option<Vec<u8>> {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.pop_front()
    }

    /// Dequeue the oldest chunk, waiting up to `wait` for one to arrive.
    pub async fn pop(&self, wait: Duration) -> Option<Vec<u8>> {
        // Register interest before the emptiness check so a push between
        // try_pop and await is not missed.
        let notified = self.notify.notified();
        if let Some(chunk) = self.try_pop() {
            return Some(chunk);
        }
        tokio::select! {
            _ = notified => self.try_pop(),
            _ = tokio::time::sleep(wait) => None,
        }
    }

    /// Chunks currently queued.
    pub fn len(&self) -> usize {
        match self.inner.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total chunks discarded to overflow since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
