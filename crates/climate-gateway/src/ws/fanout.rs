use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use climate_core::ConnId;
use climate_protocol::EventFrame;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

struct Observer {
    id: ConnId,
    tx: mpsc::Sender<String>,
}

/// Registry of open realtime connections.
///
/// Each observer gets a bounded queue drained by its own socket task, so a
/// slow client never blocks the broadcaster. An observer whose queue is
/// closed or full is evicted on the next broadcast.
pub struct NotificationFanout {
    observers: Mutex<Vec<Observer>>,
    seq: AtomicU64,
    capacity: usize,
}

impl NotificationFanout {
    pub fn new(capacity: usize) -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
            seq: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    fn observers(&self) -> MutexGuard<'_, Vec<Observer>> {
        self.observers.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// A queue sized for one observer.
    pub fn queue(&self) -> (mpsc::Sender<String>, mpsc::Receiver<String>) {
        mpsc::channel(self.capacity)
    }

    pub fn connect(&self, tx: mpsc::Sender<String>) -> ConnId {
        let id = ConnId::new();
        let mut observers = self.observers();
        observers.push(Observer { id: id.clone(), tx });
        info!(conn_id = %id, observers = observers.len(), "observer connected");
        id
    }

    /// Remove an observer. Returns whether it was still registered.
    pub fn disconnect(&self, id: &ConnId) -> bool {
        let mut observers = self.observers();
        let before = observers.len();
        observers.retain(|o| &o.id != id);
        let removed = observers.len() < before;
        if removed {
            info!(conn_id = %id, observers = observers.len(), "observer disconnected");
        }
        removed
    }

    /// Deliver `message` to every observer in registration order.
    ///
    /// Returns how many observers accepted it.
    pub fn broadcast(&self, message: &str) -> usize {
        deliver(&mut self.observers(), message)
    }

    /// Stamp `frame` with the next sequence number and broadcast it.
    ///
    /// The number is taken under the observer lock, so every observer sees
    /// frames in sequence order.
    pub fn publish(&self, frame: EventFrame) -> usize {
        let mut observers = self.observers();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let frame = frame.with_seq(seq);
        let delivered = deliver(&mut observers, &frame.to_text());
        debug!(event = %frame.event, seq, delivered, "event published");
        delivered
    }

    pub fn len(&self) -> usize {
        self.observers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn deliver(observers: &mut Vec<Observer>, message: &str) -> usize {
    let mut delivered = 0;
    observers.retain(|o| match o.tx.try_send(message.to_string()) {
        Ok(()) => {
            delivered += 1;
            true
        }
        Err(TrySendError::Full(_)) => {
            warn!(conn_id = %o.id, "observer queue full, evicting");
            false
        }
        Err(TrySendError::Closed(_)) => {
            debug!(conn_id = %o.id, "observer gone, evicting");
            false
        }
    });
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failing_observer_is_isolated_and_evicted() {
        let fanout = NotificationFanout::new(8);
        let (tx1, mut rx1) = fanout.queue();
        let (tx2, rx2) = fanout.queue();
        let (tx3, mut rx3) = fanout.queue();
        let _id1 = fanout.connect(tx1);
        let id2 = fanout.connect(tx2);
        let _id3 = fanout.connect(tx3);

        drop(rx2);
        assert_eq!(fanout.broadcast("hello"), 2);

        assert_eq!(rx1.try_recv().unwrap(), "hello");
        assert_eq!(rx3.try_recv().unwrap(), "hello");
        assert_eq!(fanout.len(), 2);
        assert!(!fanout.disconnect(&id2));
    }

    #[test]
    fn overflowing_observer_is_evicted() {
        let fanout = NotificationFanout::new(1);
        let (slow_tx, _slow_rx) = fanout.queue();
        let (fast_tx, mut fast_rx) = fanout.queue();
        fanout.connect(slow_tx);
        fanout.connect(fast_tx);

        assert_eq!(fanout.broadcast("a"), 2);
        assert_eq!(fast_rx.try_recv().unwrap(), "a");

        // The slow observer never drained its single slot.
        assert_eq!(fanout.broadcast("b"), 1);
        assert_eq!(fast_rx.try_recv().unwrap(), "b");
        assert_eq!(fanout.len(), 1);
    }

    #[test]
    fn disconnect_is_idempotent() {
        let fanout = NotificationFanout::new(4);
        let (tx, _rx) = fanout.queue();
        let id = fanout.connect(tx);
        assert!(fanout.disconnect(&id));
        assert!(!fanout.disconnect(&id));
        assert!(fanout.is_empty());
        assert_eq!(fanout.broadcast("nobody"), 0);
    }

    #[test]
    fn publish_numbers_frames() {
        let fanout = NotificationFanout::new(4);
        let (tx, mut rx) = fanout.queue();
        fanout.connect(tx);

        fanout.publish(EventFrame::new("a", serde_json::json!({})));
        fanout.publish(EventFrame::new("b", serde_json::json!({})));

        let first: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        let second: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(first["seq"], 0);
        assert_eq!(second["seq"], 1);
        assert_eq!(second["event"], "b");
    }

    #[test]
    fn concurrent_publishers_deliver_in_sequence_order() {
        let fanout = std::sync::Arc::new(NotificationFanout::new(1_000));
        let (tx, mut rx) = fanout.queue();
        fanout.connect(tx);

        let publishers: Vec<_> = (0..4)
            .map(|i| {
                let fanout = std::sync::Arc::clone(&fanout);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        fanout.publish(EventFrame::new(format!("p{i}"), serde_json::json!({})));
                    }
                })
            })
            .collect();
        for p in publishers {
            p.join().unwrap();
        }

        let mut seen = Vec::new();
        while let Ok(text) = rx.try_recv() {
            let frame: serde_json::Value = serde_json::from_str(&text).unwrap();
            seen.push(frame["seq"].as_u64().unwrap());
        }
        assert_eq!(seen, (0..400).collect::<Vec<u64>>());
    }
}
