//! Byte-level receive state machine (C2), Alaris variant.
//!
//! No `STX`/`ETX`, no in-band `ENQ`/`DC4`: frames start at `!`, end at `\r`,
//! and `ESC` aborts whatever frame is open so far (premature termination).

use crate::alaris::frame::{self, ESC};
use crate::recv::{dispatch_decoded, Dispatch};

#[derive(Debug, Default)]
pub struct Receiver {
    inside_command: bool,
    buffer: Vec<u8>,
}

impl Receiver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, byte: u8, d: &Dispatch<'_>) {
        match byte {
            ESC => {
                d.trace.trace("premature termination (ESC), discarding partial frame");
                self.buffer.clear();
                self.inside_command = false;
            }
            frame::BANG => {
                self.buffer.clear();
                self.inside_command = true;
            }
            frame::CR if self.inside_command => {
                self.inside_command = false;
                let raw = std::mem::take(&mut self.buffer);
                let decoded = frame::decode(&raw);
                if !decoded.checksum_ok {
                    d.trace.trace("Alaris checksum error on inbound frame");
                    return;
                }
                dispatch_decoded(decoded, d, frame::encode);
            }
            b if self.inside_command => self.buffer.push(b),
            other => d.trace.trace(&format!("unexpected byte received: {other:#04x}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::gate::Gate;
    use crate::reply::ReplyMailbox;
    use crate::trace::NullTraceSink;
    use crate::txqueue::TxQueue;

    struct Fixture {
        tx: TxQueue,
        mailbox: ReplyMailbox,
        events: EventBus,
        gate: Gate,
        trace: NullTraceSink,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture { tx: TxQueue::new(16), mailbox: ReplyMailbox::new(), events: EventBus::new(), gate: Gate::new(), trace: NullTraceSink }
        }
        fn dispatch(&self) -> Dispatch<'_> {
            Dispatch { tx: &self.tx, mailbox: &self.mailbox, events: &self.events, gate: &self.gate, trace: &self.trace }
        }
    }

    #[test]
    fn correct_reply_releases_gate() {
        let fx = Fixture::new();
        fx.gate.acquire();
        let mut recv = Receiver::new();
        let framed = frame::encode(b"0C");
        let d = fx.dispatch();
        for &b in &framed {
            recv.feed(b, &d);
        }
        let reply = fx.mailbox.wait_until(std::time::Instant::now()).unwrap();
        assert!(reply.body.is_ok());
        assert!(!fx.gate.release());
    }

    #[test]
    fn esc_discards_partial_frame() {
        let fx = Fixture::new();
        let mut recv = Receiver::new();
        let d = fx.dispatch();
        recv.feed(frame::BANG, &d);
        recv.feed(b'0', &d);
        recv.feed(ESC, &d);
        recv.feed(frame::CR, &d);
        assert!(fx.mailbox.wait_until(std::time::Instant::now()).is_none());
    }
}
