//! Typed publish/subscribe event bus (spec §4.F).
//!
//! `tokio::sync::broadcast` is insufficient alone: it drops to *all*
//! subscribers the moment any single subscriber falls behind. Here each
//! [`EventBus::subscribe`] call gets its own bounded ring buffer; a slow
//! subscriber only loses its own oldest events, which is reported back to
//! that subscriber as an `Error{kind:"overflow"}` event, never to the others.

mod event;

pub use event::{BusEvent, EventPayload};

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

const DEFAULT_SUBSCRIBER_CAPACITY: usize = 256;

struct Subscriber {
    queue: Mutex<VecDeque<BusEvent>>,
    capacity: usize,
    notify: tokio::sync::Notify,
}

struct Inner {
    subscribers: Mutex<HashMap<u64, Arc<Subscriber>>>,
    next_id: AtomicU64,
}

/// Cloneable handle to the bus; all clones share the same subscriber
/// registry and fan-out state.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a new subscriber with the default queue capacity.
    pub fn subscribe(&self) -> Subscription {
        self.subscribe_with_capacity(DEFAULT_SUBSCRIBER_CAPACITY)
    }

    pub fn subscribe_with_capacity(&self, capacity: usize) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let subscriber = Arc::new(Subscriber {
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity,
            notify: tokio::sync::Notify::new(),
        });
        self.inner
            .subscribers
            .lock()
            .insert(id, subscriber.clone());
        Subscription {
            id,
            subscriber,
            bus: self.inner.clone(),
        }
    }

    /// Fan the event out to every live subscriber, in publication order per
    /// subscriber (spec §5 "per-subscriber FIFO from a given producer").
    pub fn publish(&self, payload: EventPayload) {
        let event = BusEvent::new(payload);
        let subscribers = self.inner.subscribers.lock();
        for subscriber in subscribers.values() {
            let overflowed = push_with_drop_oldest(subscriber, event.clone());
            if overflowed {
                trace!("subscriber queue overflowed, oldest event dropped");
                push_with_drop_oldest(
                    subscriber,
                    BusEvent::new(EventPayload::Error {
                        kind: "overflow".to_string(),
                        message: "subscriber queue overflowed; oldest event dropped".to_string(),
                    }),
                );
            }
            subscriber.notify.notify_one();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

fn push_with_drop_oldest(subscriber: &Subscriber, event: BusEvent) -> bool {
    let mut queue = subscriber.queue.lock();
    let overflowed = if queue.len() >= subscriber.capacity {
        queue.pop_front();
        true
    } else {
        false
    };
    queue.push_back(event);
    overflowed
}

/// A live subscription. Dropping it deregisters the subscriber from the bus.
pub struct Subscription {
    id: u64,
    subscriber: Arc<Subscriber>,
    bus: Arc<Inner>,
}

impl Subscription {
    /// Wait for and return the next event, in FIFO order. At-most-once
    /// delivery: an event dropped for overflow never becomes visible here.
    pub async fn recv(&self) -> BusEvent {
        loop {
            if let Some(event) = self.subscriber.queue.lock().pop_front() {
                return event;
            }
            self.subscriber.notify.notified().await;
        }
    }

    /// Non-blocking variant used by poll loops that must not await.
    pub fn try_recv(&self) -> Option<BusEvent> {
        self.subscriber.queue.lock().pop_front()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.subscribers.lock().remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_events_in_order() {
        let bus = EventBus::new();
        let sub = bus.subscribe();
        bus.publish(EventPayload::SpeechStarted);
        bus.publish(EventPayload::SpeechEnded { utterance_len_bytes: 42 });

        let first = sub.recv().await;
        assert_eq!(first.payload, EventPayload::SpeechStarted);
        let second = sub.recv().await;
        assert_eq!(second.payload, EventPayload::SpeechEnded { utterance_len_bytes: 42 });
    }

    #[tokio::test]
    async fn one_slow_subscriber_does_not_affect_another() {
        let bus = EventBus::new();
        let slow = bus.subscribe_with_capacity(1);
        let fast = bus.subscribe();

        bus.publish(EventPayload::SpeechStarted);
        bus.publish(EventPayload::SpeechStarted);

        // slow's first event got evicted and replaced by an overflow marker.
        let slow_event = slow.recv().await;
        assert!(matches!(slow_event.payload, EventPayload::Error { .. }));

        // fast received both of its events untouched.
        assert_eq!(fast.recv().await.payload, EventPayload::SpeechStarted);
        assert_eq!(fast.recv().await.payload, EventPayload::SpeechStarted);
    }

    #[tokio::test]
    async fn dropping_subscription_deregisters() {
        let bus = EventBus::new();
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
