//! The broadcaster and its subscriber registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use peek_model::{Record, TimeRange};
use peek_query::Filter;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

/// Default capacity of each subscriber's outbound queue.
const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Drops per subscriber between warnings, after the first.
const DROP_LOG_INTERVAL: u64 = 1000;

/// Identifies one registered subscriber.
pub type SubscriberId = u64;

struct Subscriber {
    filter: Filter,
    time_range: Option<TimeRange>,
    sender: mpsc::Sender<Arc<Record>>,
    dropped: Arc<AtomicU64>,
}

struct Registry {
    subscribers: Mutex<HashMap<SubscriberId, Subscriber>>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

/// Fans committed records out to live subscribers.
///
/// The registry is guarded by a dedicated mutex held only for short,
/// I/O-free intervals; `publish` uses non-blocking sends exclusively, so
/// the writer path never waits on a subscriber.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<Registry>,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster {
    /// Creates a broadcaster with the default queue capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_queue_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Creates a broadcaster with a custom per-subscriber queue capacity.
    #[must_use]
    pub fn with_queue_capacity(capacity: usize) -> Self {
        Self {
            registry: Arc::new(Registry {
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                queue_capacity: capacity,
            }),
        }
    }

    /// Registers a subscriber with a compiled filter and optional time
    /// window.
    ///
    /// The returned [`Subscription`] owns the outbound queue; dropping it
    /// (or calling [`Subscription::cancel`]) unregisters the subscriber
    /// and closes the queue.
    #[must_use]
    pub fn subscribe(&self, filter: Filter, time_range: Option<TimeRange>) -> Subscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.registry.queue_capacity);
        let dropped = Arc::new(AtomicU64::new(0));

        self.registry.subscribers.lock().insert(
            id,
            Subscriber {
                filter,
                time_range,
                sender,
                dropped: Arc::clone(&dropped),
            },
        );

        Subscription {
            id,
            receiver,
            dropped,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Delivers a record to every subscriber whose filter accepts it.
    ///
    /// Sends are non-blocking: a subscriber with a full queue loses this
    /// record (newest preferred) and its drop counter advances. Returns
    /// the number of successful deliveries.
    pub fn publish(&self, record: &Arc<Record>) -> usize {
        let subscribers = self.registry.subscribers.lock();
        let mut delivered = 0;

        for (id, subscriber) in subscribers.iter() {
            if let Some(range) = &subscriber.time_range {
                if !range.contains(record.timestamp) {
                    continue;
                }
            }
            if !subscriber.filter.matches(record) {
                continue;
            }
            match subscriber.sender.try_send(Arc::clone(record)) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    let dropped = subscriber.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    if dropped == 1 || dropped % DROP_LOG_INTERVAL == 0 {
                        warn!(subscriber = id, dropped, "subscriber queue full, dropping");
                    }
                }
                Err(TrySendError::Closed(_)) => {
                    // Receiver already gone; the guard will unregister it.
                }
            }
        }

        delivered
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.subscribers.lock().len()
    }

    /// Unregisters every subscriber and closes their queues.
    ///
    /// Receivers observe the closed queue and exit; used at shutdown.
    pub fn close(&self) {
        self.registry.subscribers.lock().clear();
    }
}

/// One subscriber's end of the fan-out.
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<Arc<Record>>,
    dropped: Arc<AtomicU64>,
    registry: Weak<Registry>,
}

impl Subscription {
    /// This subscriber's id.
    #[must_use]
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Receives the next delivered record, or `None` once cancelled.
    pub async fn recv(&mut self) -> Option<Arc<Record>> {
        self.receiver.recv().await
    }

    /// Non-blocking receive, for draining.
    ///
    /// # Errors
    ///
    /// Returns the channel's empty/disconnected error when nothing is
    /// queued.
    pub fn try_recv(&mut self) -> Result<Arc<Record>, mpsc::error::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Records dropped for this subscriber due to a full queue.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Cancels the subscription, unregistering it and dropping any
    /// pending messages.
    pub fn cancel(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.subscribers.lock().remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;

    use chrono::{Duration, Utc};
    use peek_query::Query;

    fn record(level: &str, message: &str) -> Arc<Record> {
        Arc::new(Record {
            id: peek_model::generate_record_id(),
            timestamp: Utc::now(),
            level: level.to_string(),
            message: message.to_string(),
            fields: StdHashMap::new(),
            raw: message.to_string(),
        })
    }

    #[tokio::test]
    async fn delivers_matching_records_in_order() {
        let broadcaster = Broadcaster::new();
        let mut sub = broadcaster.subscribe(Filter::All, None);

        for i in 0..5 {
            broadcaster.publish(&record("INFO", &format!("m{i}")));
        }

        for i in 0..5 {
            let got = sub.recv().await.expect("record");
            assert_eq!(got.message, format!("m{i}"));
        }
    }

    #[tokio::test]
    async fn filter_gates_delivery() {
        let broadcaster = Broadcaster::new();
        let filter = Query::parse("level:ERROR").expect("parse").into_filter();
        let mut sub = broadcaster.subscribe(filter, None);

        assert_eq!(broadcaster.publish(&record("INFO", "skip")), 0);
        assert_eq!(broadcaster.publish(&record("ERROR", "take")), 1);

        let got = sub.recv().await.expect("record");
        assert_eq!(got.message, "take");
        assert!(sub.try_recv().is_err());
    }

    #[tokio::test]
    async fn time_window_gates_delivery() {
        let broadcaster = Broadcaster::new();
        let cutoff = Utc::now();
        let mut sub = broadcaster.subscribe(Filter::All, Some(TimeRange::since(cutoff)));

        let mut old = Record::clone(&record("INFO", "old"));
        old.timestamp = cutoff - Duration::hours(1);
        assert_eq!(broadcaster.publish(&Arc::new(old)), 0);
        assert_eq!(broadcaster.publish(&record("INFO", "new")), 1);

        let got = sub.recv().await.expect("record");
        assert_eq!(got.message, "new");
    }

    #[tokio::test]
    async fn full_queue_drops_newest_without_blocking() {
        let broadcaster = Broadcaster::with_queue_capacity(3);
        let mut sub = broadcaster.subscribe(Filter::All, None);

        for i in 0..10 {
            broadcaster.publish(&record("INFO", &format!("m{i}")));
        }

        // Exactly the overflow was dropped; the queued prefix survived.
        assert_eq!(sub.dropped(), 7);
        for i in 0..3 {
            let got = sub.try_recv().expect("queued record");
            assert_eq!(got.message, format!("m{i}"));
        }
        assert!(sub.try_recv().is_err());

        // After draining, delivery resumes normally.
        assert_eq!(broadcaster.publish(&record("INFO", "resumed")), 1);
        let got = sub.try_recv().expect("record");
        assert_eq!(got.message, "resumed");
    }

    #[tokio::test]
    async fn fan_out_with_slow_and_fast_subscribers() {
        let broadcaster = Broadcaster::new();
        let mut fast = broadcaster.subscribe(Filter::All, None);
        let mut slow =
            broadcaster.subscribe(Query::parse("level:ERROR").expect("parse").into_filter(), None);

        // The fast subscriber drains as records are published; the slow
        // one does not drain at all.
        let mut fast_received = Vec::new();
        for i in 0..200 {
            broadcaster.publish(&record("ERROR", &format!("m{i}")));
            while let Ok(got) = fast.try_recv() {
                fast_received.push(got.message.clone());
            }
        }

        assert_eq!(fast_received.len(), 200);
        for (i, message) in fast_received.iter().enumerate() {
            assert_eq!(message, &format!("m{i}"));
        }

        // The slow subscriber kept its queue capacity and dropped the rest.
        assert_eq!(slow.dropped(), 100);
        let mut slow_received = 0;
        for _ in 0..50 {
            slow.try_recv().expect("queued record");
            slow_received += 1;
        }
        assert_eq!(slow_received, 50);

        // With 50 slots free, 50 more publishes all land.
        drop(fast);
        for i in 0..50 {
            assert_eq!(broadcaster.publish(&record("ERROR", &format!("late{i}"))), 1);
        }
        let mut drained = 0;
        while slow.try_recv().is_ok() {
            drained += 1;
        }
        assert_eq!(drained, 100); // 50 leftover + 50 new
    }

    #[tokio::test]
    async fn cancel_unregisters_and_closes() {
        let broadcaster = Broadcaster::new();
        let sub = broadcaster.subscribe(Filter::All, None);
        assert_eq!(broadcaster.subscriber_count(), 1);

        sub.cancel();
        assert_eq!(broadcaster.subscriber_count(), 0);
        assert_eq!(broadcaster.publish(&record("INFO", "nobody")), 0);
    }

    #[tokio::test]
    async fn close_ends_all_receivers() {
        let broadcaster = Broadcaster::new();
        let mut sub = broadcaster.subscribe(Filter::All, None);

        broadcaster.close();
        assert_eq!(broadcaster.subscriber_count(), 0);
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn publish_counts_deliveries_across_subscribers() {
        let broadcaster = Broadcaster::new();
        let _a = broadcaster.subscribe(Filter::All, None);
        let _b = broadcaster.subscribe(Filter::All, None);
        let _c =
            broadcaster.subscribe(Query::parse("level:WARN").expect("parse").into_filter(), None);

        assert_eq!(broadcaster.publish(&record("INFO", "x")), 2);
        assert_eq!(broadcaster.publish(&record("WARN", "y")), 3);
    }
}
