use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

use crate::event::{now_ms, DashboardEvent, Envelope, EventSource};

/// Synchronous fan-out bus for dashboard events.
///
/// Every subscriber gets its own queue; publishing stamps the envelope and
/// clones it to each live subscriber, pruning queues whose receiver is
/// gone. Delivery order per subscriber is publish order; nothing is
/// guaranteed across independent publishers.
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<Envelope>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> Receiver<Envelope> {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .expect("bus subscribers lock")
            .push(tx);
        rx
    }

    /// Stamps `event` with `source` and the current time, then delivers it
    /// to every subscriber.
    pub fn publish(&self, source: EventSource, event: DashboardEvent) {
        let envelope = Envelope {
            source,
            timestamp_ms: now_ms(),
            event,
        };
        let mut subscribers = self.subscribers.lock().expect("bus subscribers lock");
        subscribers.retain(|tx| tx.send(envelope.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("bus subscribers lock")
            .len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
