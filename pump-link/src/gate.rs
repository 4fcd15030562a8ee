//! One-in-flight command/reply gate (C4).
//!
//! Modeled as an explicit two-state machine rather than a raw counting
//! semaphore: the source this crate is grounded on repeatedly releases a
//! counting gate twice (once on the reply path, once on a racing timeout),
//! which eventually lets two commands through at once. Here `release` on an
//! already-`Idle` gate is simply a no-op instead of corrupting a count.

use std::sync::{Condvar, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    InFlight,
}

pub struct Gate {
    state: Mutex<State>,
    cv: Condvar,
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

impl Gate {
    pub fn new() -> Self {
        Gate { state: Mutex::new(State::Idle), cv: Condvar::new() }
    }

    /// Blocks until the gate is `Idle`, then transitions to `InFlight`.
    pub fn acquire(&self) {
        let mut state = self.state.lock().unwrap();
        while *state == State::InFlight {
            state = self.cv.wait(state).unwrap();
        }
        *state = State::InFlight;
    }

    /// Transitions `InFlight` -> `Idle` and wakes one waiter.
    ///
    /// Returns `false` if the gate was already `Idle`, i.e. a double-release
    /// was attempted; callers should treat that as a logic bug worth tracing
    /// but not worth panicking over, since it is reachable from racing
    /// timeout/reply paths.
    pub fn release(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        match *state {
            State::InFlight => {
                *state = State::Idle;
                drop(state);
                self.cv.notify_one();
                true
            }
            State::Idle => false,
        }
    }
}
