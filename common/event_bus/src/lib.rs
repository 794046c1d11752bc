//! A process-local typed publish/subscribe bus.
//!
//! Generalises the pattern in Lighthouse's `beacon_chain::events::
//! ServerSentEventHandler` (one broadcast channel per event kind) into a
//! single bus keyed by an arbitrary `Topic` type, with synchronous,
//! per-subscriber error isolation instead of `tokio::sync::broadcast`'s
//! decoupled-receiver model — the design note in spec.md §4.4 calls for
//! delivery to run inline on the publisher's task, which a broadcast
//! channel cannot express directly (each receiver polls independently).
//!
//! Collapses the two pub/sub styles Lighthouse itself mixes (state-container
//! callback lists, and an external SSE event bus) into one, per spec.md §9.

use parking_lot::Mutex;
use slog::{error, warn, Logger};
use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type Handler<Event> = dyn Fn(&Event) -> Result<(), String> + Send + Sync;

struct Subscription<Event> {
    id: u64,
    handler: Arc<Handler<Event>>,
}

/// Returned by `subscribe`; pass to `unsubscribe` to remove the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionHandle<Topic> {
    topic: Topic,
    id: u64,
}

/// A typed pub/sub bus. `Topic` identifies the closed set of channels;
/// `Event` is the payload type carried by every topic (typically an enum
/// with one variant per topic, mirroring spec.md §3's closed event set).
pub struct Bus<Topic, Event> {
    subscribers: Mutex<HashMap<Topic, Vec<Subscription<Event>>>>,
    next_id: AtomicU64,
    log: Logger,
}

impl<Topic, Event> Bus<Topic, Event>
where
    Topic: Eq + Hash + Clone + std::fmt::Debug,
{
    pub fn new(log: Logger) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            log,
        }
    }

    /// Registers `handler` for `topic`. Handlers run synchronously, inline,
    /// on the thread that calls `publish` — they should hand off to their
    /// own worker if they need to do anything beyond fast bookkeeping.
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> SubscriptionHandle<Topic>
    where
        F: Fn(&Event) -> Result<(), String> + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut subs = self.subscribers.lock();
        subs.entry(topic.clone()).or_default().push(Subscription {
            id,
            handler: Arc::new(handler),
        });
        SubscriptionHandle { topic, id }
    }

    pub fn unsubscribe(&self, handle: SubscriptionHandle<Topic>) {
        let mut subs = self.subscribers.lock();
        if let Some(list) = subs.get_mut(&handle.topic) {
            list.retain(|s| s.id != handle.id);
        }
    }

    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.subscribers
            .lock()
            .get(topic)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    /// Delivers `event` to every subscriber currently registered for
    /// `topic`, in subscription order. A handler that panics or returns an
    /// error is logged (annotated with the topic) and does not prevent
    /// delivery to subsequent subscribers. The subscriber list is snapshot
    /// under the lock and the lock is released before any handler runs —
    /// handlers that subscribe further handlers mid-delivery see them only
    /// on the next `publish` call.
    pub fn publish(&self, topic: Topic, event: Event)
    where
        Event: Clone,
    {
        let snapshot: Vec<Arc<Handler<Event>>> = {
            let subs = self.subscribers.lock();
            subs.get(&topic)
                .map(|list| list.iter().map(|s| s.handler.clone()).collect())
                .unwrap_or_default()
        };

        for handler in snapshot {
            let event = event.clone();
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(&event)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(message)) => {
                    warn!(self.log, "Event bus subscriber returned an error";
                        "topic" => ?topic, "error" => message);
                }
                Err(panic) => {
                    error!(self.log, "Event bus subscriber panicked"; "topic" => ?topic,
                        "panic" => panic_message(&panic));
                }
            }
        }
    }
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn null_log() -> Logger {
        Logger::root(slog::Discard.fuse(), slog::o!())
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Topic {
        A,
    }

    #[test]
    fn delivers_in_publish_order_to_one_subscriber() {
        let bus: Bus<Topic, i32> = Bus::new(null_log());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        bus.subscribe(Topic::A, move |event: &i32| {
            seen2.lock().push(*event);
            Ok(())
        });

        for i in 0..5 {
            bus.publish(Topic::A, i);
        }

        assert_eq!(*seen.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn erroring_handler_does_not_block_other_subscribers() {
        let bus: Bus<Topic, i32> = Bus::new(null_log());
        let second_saw = Arc::new(AtomicUsize::new(0));
        let second_saw2 = second_saw.clone();

        bus.subscribe(Topic::A, |_event: &i32| Err("boom".to_string()));
        bus.subscribe(Topic::A, move |_event: &i32| {
            second_saw2.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        for i in 0..3 {
            bus.publish(Topic::A, i);
        }

        assert_eq!(second_saw.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn panicking_handler_does_not_block_other_subscribers() {
        let bus: Bus<Topic, i32> = Bus::new(null_log());
        let second_saw = Arc::new(AtomicUsize::new(0));
        let second_saw2 = second_saw.clone();

        bus.subscribe(Topic::A, |_event: &i32| panic!("boom"));
        bus.subscribe(Topic::A, move |_event: &i32| {
            second_saw2.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        bus.publish(Topic::A, 1);
        assert_eq!(second_saw.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus: Bus<Topic, i32> = Bus::new(null_log());
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        let handle = bus.subscribe(Topic::A, move |_: &i32| {
            count2.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        bus.publish(Topic::A, 1);
        bus.unsubscribe(handle);
        bus.publish(Topic::A, 2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
