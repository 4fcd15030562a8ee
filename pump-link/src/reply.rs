//! Reply record and the rx-reply mailbox shared between the reader thread
//! (C2) and command callers (C4).
//!
//! The gate (§4.4) already enforces at most one command in flight, so at
//! most one reply is ever pending; a single-slot mailbox with
//! last-write-wins semantics is the natural shape for this, and matches the
//! `LifoQueue` used for `recvq` in the original source (a stack degenerates
//! to last-write-wins once depth never exceeds one).

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::{AppError, LinkError};

#[derive(Debug, Clone)]
pub enum ReplyError {
    Link(LinkError),
    App(AppError),
}

/// A decoded reply addressed to whichever command is currently in flight.
#[derive(Debug, Clone)]
pub struct Reply {
    pub origin: u8,
    pub body: Result<Vec<u8>, ReplyError>,
}

#[derive(Default)]
pub struct ReplyMailbox {
    slot: Mutex<Option<Reply>>,
    cv: Condvar,
}

impl ReplyMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers a reply, overwriting any previous undelivered value.
    pub fn deliver(&self, reply: Reply) {
        let mut slot = self.slot.lock().unwrap();
        *slot = Some(reply);
        drop(slot);
        self.cv.notify_all();
    }

    /// Blocks until a reply is delivered or `deadline` passes, consuming
    /// whatever value is present (last-write-wins).
    pub fn wait_until(&self, deadline: Instant) -> Option<Reply> {
        let mut slot = self.slot.lock().unwrap();
        loop {
            if let Some(reply) = slot.take() {
                return Some(reply);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, timeout) = self
                .cv
                .wait_timeout(slot, deadline - now)
                .unwrap();
            slot = guard;
            if timeout.timed_out() && slot.is_none() {
                return None;
            }
        }
    }
}

pub fn deadline_from(timeout: Duration) -> Instant {
    Instant::now() + timeout
}
