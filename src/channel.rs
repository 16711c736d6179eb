//! Cross-realm channel primitives.
//!
//! [`RealmChannel`] models the host platform's raw boundary: at-most-once
//! delivery, no acknowledgement, no retry, and a message sent before the
//! consumer registers its listener is silently dropped — never buffered by
//! the channel itself.
//!
//! [`ReplayOutbox`] is the producer-side answer to that lossiness: it retains
//! the latest configuration snapshot and any pending commands while the
//! consumer is not yet ready, then replays them exactly once when the
//! consumer's readiness signal arrives. Each readiness signal marks a fresh
//! consumer instance (a new page load), and the latest snapshot is replayed
//! to every instance; pending commands are delivered to whichever instance
//! shows up first.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

use crate::protocol::RealmMessage;

// ── Lossy channel ───────────────────────────────────────────────────────────

/// One direction of the realm boundary.
pub struct RealmChannel<T> {
    name: &'static str,
    listener: Mutex<Option<mpsc::UnboundedSender<T>>>,
    dropped: AtomicU64,
}

impl<T> RealmChannel<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            listener: Mutex::new(None),
            dropped: AtomicU64::new(0),
        }
    }

    /// Register the consuming realm's listener, replacing any previous one.
    /// Messages sent before this call are already lost.
    pub fn register(&self) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.listener.lock().unwrap() = Some(tx);
        rx
    }

    /// Best-effort send. Returns `false` when the message was dropped because
    /// no live listener is registered.
    pub fn send(&self, message: T) -> bool {
        let mut listener = self.listener.lock().unwrap();
        let delivered = match listener.as_ref() {
            Some(tx) => {
                if tx.send(message).is_ok() {
                    true
                } else {
                    // Receiver was torn down with the realm.
                    *listener = None;
                    false
                }
            }
            None => false,
        };
        if !delivered {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(channel = self.name, "message dropped, no listener");
        }
        delivered
    }

    /// How many messages were dropped for lack of a listener.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

// ── Replay outbox ───────────────────────────────────────────────────────────

#[derive(Default)]
struct OutboxState {
    consumer_ready: bool,
    latest_snapshot: Option<RealmMessage>,
    pending: VecDeque<RealmMessage>,
}

/// Pub/sub-with-replay wrapper around the page-bound [`RealmChannel`].
pub struct ReplayOutbox {
    channel: RealmChannel<RealmMessage>,
    state: Mutex<OutboxState>,
}

impl ReplayOutbox {
    pub fn new(channel: RealmChannel<RealmMessage>) -> Self {
        Self {
            channel,
            state: Mutex::new(OutboxState::default()),
        }
    }

    /// Register the page-realm listener on the underlying channel.
    pub fn register(&self) -> mpsc::UnboundedReceiver<RealmMessage> {
        self.channel.register()
    }

    /// Queue or deliver a message.
    ///
    /// Before the consumer signals readiness nothing is sent: snapshots
    /// replace the retained latest, commands queue in order. Once ready,
    /// messages go straight through; a failed send means the consumer
    /// instance is gone, so the outbox reverts to buffering.
    pub fn send(&self, message: RealmMessage) {
        let mut state = self.state.lock().unwrap();
        if message.is_snapshot() {
            state.latest_snapshot = Some(message.clone());
            if state.consumer_ready && !self.channel.send(message) {
                state.consumer_ready = false;
            }
            return;
        }

        if state.consumer_ready {
            if !self.channel.send(message.clone()) {
                state.consumer_ready = false;
                state.pending.push_back(message);
            }
        } else {
            state.pending.push_back(message);
        }
    }

    /// Handle the consumer's readiness signal: replay the retained snapshot,
    /// then drain pending commands in order, then switch to direct delivery.
    pub fn mark_ready(&self) {
        let mut state = self.state.lock().unwrap();
        state.consumer_ready = true;

        if let Some(snapshot) = state.latest_snapshot.clone() {
            if !self.channel.send(snapshot) {
                state.consumer_ready = false;
                return;
            }
        }

        while let Some(message) = state.pending.pop_front() {
            if !self.channel.send(message.clone()) {
                state.pending.push_front(message);
                state.consumer_ready = false;
                return;
            }
        }
    }

    /// Whether the consumer has signaled readiness and is still reachable.
    pub fn consumer_ready(&self) -> bool {
        self.state.lock().unwrap().consumer_ready
    }

    pub fn dropped(&self) -> u64 {
        self.channel.dropped()
    }
}
