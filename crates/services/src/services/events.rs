//! Live fan-out of committed events.
//!
//! Each observer gets its own bounded queue. `broadcast` never awaits: a
//! closed observer is dropped, and one whose queue is full is evicted so its
//! stream ends and the client reconnects (history comes from the event
//! query, not from this channel). Nothing is replayed to new observers.

use std::{
    pin::Pin,
    sync::{
        Arc, Weak,
        atomic::{AtomicU64, Ordering},
    },
    task::{Context, Poll},
};

use dashmap::DashMap;
use db::models::event_log::EventLog;
use futures::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};

pub const DEFAULT_OBSERVER_BUFFER: usize = 256;

pub type SubscriberId = u64;

struct Registry {
    subscribers: DashMap<SubscriberId, mpsc::Sender<EventLog>>,
    next_id: AtomicU64,
    buffer: usize,
}

#[derive(Clone)]
pub struct EventService {
    registry: Arc<Registry>,
}

impl EventService {
    pub fn new(buffer: usize) -> Self {
        Self {
            registry: Arc::new(Registry {
                subscribers: DashMap::new(),
                next_id: AtomicU64::new(1),
                buffer: buffer.max(1),
            }),
        }
    }

    /// Register an observer. It receives every event broadcast from now on,
    /// until the returned handle is dropped or evicted.
    pub fn subscribe(&self) -> Subscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.registry.buffer);
        self.registry.subscribers.insert(id, tx);
        tracing::debug!(subscriber = id, "Live update observer connected");

        Subscription {
            id,
            receiver: rx,
            registry: Arc::downgrade(&self.registry),
        }
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.registry.subscribers.remove(&id).is_some();
        if removed {
            tracing::debug!(subscriber = id, "Live update observer disconnected");
        }
        removed
    }

    /// Push `event` to every connected observer. Returns how many accepted it.
    /// Per-observer failures only affect that observer.
    pub fn broadcast(&self, event: &EventLog) -> usize {
        let mut delivered = 0;
        self.registry
            .subscribers
            .retain(|id, tx| match tx.try_send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        subscriber = *id,
                        event_id = %event.id,
                        "Live update observer fell behind; evicting"
                    );
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(subscriber = *id, "Live update observer gone");
                    false
                }
            });
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.subscribers.len()
    }
}

impl Default for EventService {
    fn default() -> Self {
        Self::new(DEFAULT_OBSERVER_BUFFER)
    }
}

/// Handle for one observer; a `Stream` of events that deregisters on drop.
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<EventLog>,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

impl Stream for Subscription {
    type Item = EventLog;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.subscribers.remove(&self.id);
        }
    }
}
