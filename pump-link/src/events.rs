//! Spontaneous-event channel (C5): fan-out of device-initiated notifications
//! to any number of subscribers. Unbounded by default, per spec.md §4.5
//! ("subscribers are expected to keep up").

use std::sync::mpsc;
use std::sync::Mutex;
use std::time::SystemTime;

#[derive(Debug, Clone)]
pub struct SpontEvent {
    pub timestamp: SystemTime,
    pub origin: u8,
    pub payload: Vec<u8>,
}

#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<mpsc::Sender<SpontEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> mpsc::Receiver<SpontEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    /// Fans the event out to every live subscriber, dropping any whose
    /// receiver has gone away.
    pub fn publish(&self, event: SpontEvent) {
        let mut subs = self.subscribers.lock().unwrap();
        subs.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn published_event_reaches_all_subscribers() {
        let bus = EventBus::new();
        let rx1 = bus.subscribe();
        let rx2 = bus.subscribe();
        bus.publish(SpontEvent { timestamp: SystemTime::now(), origin: 2, payload: b"r000007D0".to_vec() });
        assert_eq!(rx1.recv().unwrap().origin, 2);
        assert_eq!(rx2.recv().unwrap().origin, 2);
    }

    #[test]
    fn dropped_subscriber_does_not_block_publish() {
        let bus = EventBus::new();
        {
            let _rx = bus.subscribe();
        }
        bus.publish(SpontEvent { timestamp: SystemTime::now(), origin: 1, payload: vec![] });
    }
}
