//! Remote-control keep-alive ticker (C8).
//!
//! The Alaris device requires periodic `REMOTE_CTRL^ENABLED^<secCode>` /
//! `REMOTE_CFG^ENABLED^<secCode>` frames to grant and retain host authority.
//! `disable` is made idempotent (a plain `AtomicBool` flag) because the
//! grounding source calls it unconditionally on loop exit regardless of
//! whether disabling was actually the reason the loop stopped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::alaris::frame;
use crate::txqueue::{TxClass, TxQueue};

fn enabled_body(verb: &[u8], sec_code: &[u8; 4]) -> Vec<u8> {
    let mut body = verb.to_vec();
    body.extend_from_slice(b"^ENABLED^");
    body.extend_from_slice(sec_code);
    body
}

fn disabled_body(verb: &[u8]) -> Vec<u8> {
    let mut body = verb.to_vec();
    body.extend_from_slice(b"^DISABLED");
    body
}

/// CRC-CCITT/FALSE over the raw serial-number reply, used as the
/// remote-control bearer credential.
pub fn sec_code(serial_reply: &[u8]) -> [u8; 4] {
    frame::checksum(serial_reply)
}

pub struct Looper {
    tx: Arc<TxQueue>,
    running: Arc<AtomicBool>,
    disabled: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Looper {
    pub fn start(tx: Arc<TxQueue>, sec_code: [u8; 4], interval: Duration) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let disabled = Arc::new(AtomicBool::new(false));
        let handle = {
            let tx = Arc::clone(&tx);
            let running = Arc::clone(&running);
            let disabled = Arc::clone(&disabled);
            thread::spawn(move || run(tx, sec_code, interval, running, disabled))
        };
        Looper { tx, running, disabled, handle: Some(handle) }
    }

    /// Sends `^DISABLED` exactly once, even if called more than once or
    /// raced against the ticker thread's own teardown call.
    pub fn disable(&self) {
        disable_once(&self.tx, &self.disabled);
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for Looper {
    fn drop(&mut self) {
        self.stop();
        self.disable();
    }
}

fn run(tx: Arc<TxQueue>, sec_code: [u8; 4], interval: Duration, running: Arc<AtomicBool>, disabled: Arc<AtomicBool>) {
    while running.load(Ordering::SeqCst) {
        tx.try_enqueue(TxClass::FlowControl, frame::encode(&enabled_body(b"REMOTE_CTRL", &sec_code)));
        tx.try_enqueue(TxClass::FlowControl, frame::encode(&enabled_body(b"REMOTE_CFG", &sec_code)));
        thread::sleep(interval);
    }
    disable_once(&tx, &disabled);
}

fn disable_once(tx: &TxQueue, disabled: &AtomicBool) {
    if disabled.swap(true, Ordering::SeqCst) {
        return;
    }
    tx.try_enqueue(TxClass::FlowControl, frame::encode(&disabled_body(b"REMOTE_CTRL")));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disable_is_idempotent() {
        let tx = Arc::new(TxQueue::new(64));
        let looper = Looper::start(Arc::clone(&tx), [b'0', b'0', b'0', b'0'], Duration::from_millis(5));
        thread::sleep(Duration::from_millis(20));
        looper.disable();
        looper.disable();

        let mut disabled_frames = 0;
        while let Some(frame) = tx.try_dequeue() {
            if frame.windows(b"DISABLED".len()).any(|w| w == b"DISABLED") {
                disabled_frames += 1;
            }
        }
        assert_eq!(disabled_frames, 1, "disable() must send ^DISABLED exactly once even when called twice");
    }
}
