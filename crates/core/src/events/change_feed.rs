//! Publish-on-commit change feed backing live queries.
//!
//! Services emit a [`DomainEvent`] after every committed write. The feed fans
//! those out over a broadcast channel and bumps a commit version, so callers
//! can either subscribe and await changes or poll [`ChangeFeed::version`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
#[cfg(test)]
use std::sync::Mutex;

use log::debug;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use super::DomainEvent;

/// Receives a [`DomainEvent`] after each committed write. Implementations
/// must not block; a lost event never fails the write that produced it.
pub trait DomainEventSink: Send + Sync {
    fn emit(&self, event: DomainEvent);
}

/// Sink for services running without live queries.
#[derive(Clone, Copy, Default)]
pub struct NoOpDomainEventSink;

impl DomainEventSink for NoOpDomainEventSink {
    fn emit(&self, _event: DomainEvent) {}
}

/// Keeps every emitted event so tests can assert on the commit sequence.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct RecordingSink {
    events: Arc<Mutex<Vec<DomainEvent>>>,
}

#[cfg(test)]
impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }

    pub(crate) fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

#[cfg(test)]
impl DomainEventSink for RecordingSink {
    fn emit(&self, event: DomainEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Buffered notifications per subscriber before it is considered lagging.
const CHANGE_FEED_CAPACITY: usize = 64;

struct FeedInner {
    tx: broadcast::Sender<DomainEvent>,
    version: AtomicU64,
}

/// Cloneable handle to the change feed.
#[derive(Clone)]
pub struct ChangeFeed {
    inner: Arc<FeedInner>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            inner: Arc::new(FeedInner {
                tx,
                version: AtomicU64::new(0),
            }),
        }
    }

    /// Number of commits published so far.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::SeqCst)
    }

    /// Starts a subscription that observes every commit published after this call.
    pub fn subscribe(&self) -> ChangeSubscription {
        ChangeSubscription {
            rx: self.inner.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }
}

impl DomainEventSink for ChangeFeed {
    fn emit(&self, event: DomainEvent) {
        let version = self.inner.version.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Publishing change #{}: {:?}", version, event);
        // No subscribers is fine, pollers still see the version bump.
        let _ = self.inner.tx.send(event);
    }
}

/// Receiving side of the change feed.
///
/// Notifications are coalesced: a consumer only needs to know that the
/// table changed since its last snapshot, not how many times.
pub struct ChangeSubscription {
    rx: broadcast::Receiver<DomainEvent>,
}

impl ChangeSubscription {
    /// Waits for the next change.
    ///
    /// Returns `false` once the feed is gone and no further changes can arrive.
    pub async fn changed(&mut self) -> bool {
        match self.rx.recv().await {
            Ok(_) | Err(RecvError::Lagged(_)) => {
                self.drain();
                true
            }
            Err(RecvError::Closed) => false,
        }
    }

    /// Non-blocking check used by pollers. Returns true if anything changed
    /// since the previous call.
    pub fn try_changed(&mut self) -> bool {
        match self.rx.try_recv() {
            Ok(_) | Err(TryRecvError::Lagged(_)) => {
                self.drain();
                true
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => false,
        }
    }

    fn drain(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }
}
