//! Bounded, priority transmit queue (C3).
//!
//! Three classes as described for the historical variant: flow-control
//! replies (`DC4`, `ACK`, `NAK+code`) always drain ahead of spontaneous-event
//! echoes, which drain ahead of command frames. This is kept as the default
//! (not an optional variant) because it is the only way to guarantee P4
//! (every `ENQ` gets a `DC4` before any other host-initiated byte) when a
//! command frame is already queued.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TxClass {
    FlowControl,
    Spontaneous,
    Command,
}

struct Inner {
    flow: VecDeque<Vec<u8>>,
    spont: VecDeque<Vec<u8>>,
    cmd: VecDeque<Vec<u8>>,
    capacity: usize,
    closed: bool,
}

impl Inner {
    fn len(&self) -> usize {
        self.flow.len() + self.spont.len() + self.cmd.len()
    }
}

pub struct TxQueue {
    inner: Mutex<Inner>,
    cv: Condvar,
}

impl TxQueue {
    pub fn new(capacity: usize) -> Self {
        TxQueue {
            inner: Mutex::new(Inner {
                flow: VecDeque::new(),
                spont: VecDeque::new(),
                cmd: VecDeque::new(),
                capacity,
                closed: false,
            }),
            cv: Condvar::new(),
        }
    }

    /// Enqueues a frame for the given priority class. Returns `false`
    /// ("queue full") rather than blocking, per spec.md §4.3 for
    /// non-blocking producers (the reader thread, spontaneous acks).
    pub fn try_enqueue(&self, class: TxClass, frame: Vec<u8>) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.len() >= inner.capacity {
            return false;
        }
        match class {
            TxClass::FlowControl => inner.flow.push_back(frame),
            TxClass::Spontaneous => inner.spont.push_back(frame),
            TxClass::Command => inner.cmd.push_back(frame),
        }
        drop(inner);
        self.cv.notify_one();
        true
    }

    /// Blocks until a frame is available (highest priority first) or the
    /// queue is closed.
    pub fn dequeue(&self) -> Option<Vec<u8>> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(f) = inner.flow.pop_front() {
                return Some(f);
            }
            if let Some(f) = inner.spont.pop_front() {
                return Some(f);
            }
            if let Some(f) = inner.cmd.pop_front() {
                return Some(f);
            }
            if inner.closed {
                return None;
            }
            inner = self.cv.wait(inner).unwrap();
        }
    }

    /// Non-blocking priority pop, for draining in tests without racing a
    /// producer thread's liveness.
    pub fn try_dequeue(&self) -> Option<Vec<u8>> {
        let mut inner = self.inner.lock().unwrap();
        inner.flow.pop_front().or_else(|| inner.spont.pop_front()).or_else(|| inner.cmd.pop_front())
    }

    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        drop(inner);
        self.cv.notify_all();
    }
}
