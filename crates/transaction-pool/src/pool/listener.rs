//! Event fan-out for the transaction pool.

use crate::{
    config::EVENT_CHANNEL_CAPACITY,
    pool::events::{PoolEvent, PoolEventKind},
};
use arbor_primitives::B256;
use fnv::FnvHashMap;
use metrics::Counter;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, watch};

/// Publishes pool events to subscribers over bounded buffers.
///
/// Delivery is best-effort: a subscriber that falls more than
/// [`EVENT_CHANNEL_CAPACITY`] events behind loses the oldest events and the
/// loss is counted, so a slow subscriber can never stall the dispatcher.
pub(crate) struct EventBus {
    sender: broadcast::Sender<PoolEvent>,
    next_id: AtomicU64,
    cancels: Mutex<FnvHashMap<u64, watch::Sender<bool>>>,
    overflow: Counter,
}

impl EventBus {
    pub(crate) fn new(overflow: Counter) -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender, next_id: AtomicU64::new(0), cancels: Mutex::new(Default::default()), overflow }
    }

    /// Sends an event to all live subscribers.
    pub(crate) fn publish(&self, hash: B256, kind: PoolEventKind) {
        // Err means nobody is listening
        let _ = self.sender.send(PoolEvent { hash, kind });
    }

    /// Opens a subscription for the given event kinds; an empty filter
    /// receives everything.
    pub(crate) fn subscribe(&self, kinds: &[PoolEventKind]) -> EventSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let mut cancels = self.cancels.lock();
        cancels.retain(|_, tx| !tx.is_closed());
        cancels.insert(id, cancel_tx);
        EventSubscription {
            id,
            kinds: kinds.to_vec(),
            events: self.sender.subscribe(),
            cancel: cancel_rx,
            overflow: self.overflow.clone(),
            missed: 0,
        }
    }

    /// Terminates the subscription with the given id.
    ///
    /// Returns `false` if no such subscription is live.
    pub(crate) fn cancel(&self, id: u64) -> bool {
        match self.cancels.lock().remove(&id) {
            Some(cancel) => cancel.send(true).is_ok(),
            None => false,
        }
    }

    /// Number of live subscribers.
    pub(crate) fn subscribers(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Receiving half of a pool event subscription.
pub struct EventSubscription {
    id: u64,
    kinds: Vec<PoolEventKind>,
    events: broadcast::Receiver<PoolEvent>,
    cancel: watch::Receiver<bool>,
    overflow: Counter,
    missed: u64,
}

impl std::fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSubscription")
            .field("id", &self.id)
            .field("kinds", &self.kinds)
            .field("missed", &self.missed)
            .finish_non_exhaustive()
    }
}

impl EventSubscription {
    /// Identifier used to cancel this subscription.
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Events lost so far because this subscriber lagged behind.
    pub const fn missed(&self) -> u64 {
        self.missed
    }

    /// Receives the next matching event.
    ///
    /// Returns `None` once the subscription was cancelled or the pool shut
    /// down.
    pub async fn recv(&mut self) -> Option<PoolEvent> {
        loop {
            tokio::select! {
                changed = self.cancel.changed() => {
                    if changed.is_err() || *self.cancel.borrow() {
                        return None
                    }
                }
                event = self.events.recv() => match event {
                    Ok(event) => {
                        if self.kinds.is_empty() || self.kinds.contains(&event.kind) {
                            return Some(event)
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        self.missed += n;
                        self.overflow.increment(n);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn bus() -> EventBus {
        EventBus::new(Counter::noop())
    }

    fn hash(byte: u8) -> B256 {
        B256::with_last_byte(byte)
    }

    #[tokio::test]
    async fn filters_by_kind() {
        let bus = bus();
        let mut sub = bus.subscribe(&[PoolEventKind::Promoted]);

        bus.publish(hash(1), PoolEventKind::Enqueued);
        bus.publish(hash(2), PoolEventKind::Promoted);

        let event = sub.recv().await.unwrap();
        assert_eq!(event.hash, hash(2));
        assert_eq!(event.kind, PoolEventKind::Promoted);
    }

    #[tokio::test]
    async fn empty_filter_receives_everything() {
        let bus = bus();
        let mut sub = bus.subscribe(&[]);

        bus.publish(hash(1), PoolEventKind::Enqueued);
        bus.publish(hash(2), PoolEventKind::Dropped);

        assert_eq!(sub.recv().await.unwrap().kind, PoolEventKind::Enqueued);
        assert_eq!(sub.recv().await.unwrap().kind, PoolEventKind::Dropped);
    }

    #[tokio::test]
    async fn cancel_ends_subscription() {
        let bus = bus();
        let mut sub = bus.subscribe(&[]);
        let id = sub.id();

        assert!(bus.cancel(id));
        assert!(sub.recv().await.is_none());
        assert!(!bus.cancel(id));
    }

    #[tokio::test]
    async fn slow_subscriber_drops_oldest() {
        let bus = bus();
        let mut sub = bus.subscribe(&[]);

        for i in 0..(EVENT_CHANNEL_CAPACITY as u64 + 3) {
            bus.publish(hash(i as u8), PoolEventKind::Enqueued);
        }

        // oldest three events were displaced
        let first = sub.recv().await.unwrap();
        assert_eq!(first.hash, hash(3));
        assert_eq!(sub.missed(), 3);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_silent() {
        let bus = bus();
        bus.publish(hash(1), PoolEventKind::Enqueued);
        assert_eq!(bus.subscribers(), 0);

        let mut sub = bus.subscribe(&[]);
        assert_eq!(bus.subscribers(), 1);

        // events published before subscribing are not replayed
        bus.publish(hash(2), PoolEventKind::Enqueued);
        let event = tokio::time::timeout(Duration::from_secs(1), sub.recv()).await.unwrap();
        assert_eq!(event.unwrap().hash, hash(2));
    }
}
