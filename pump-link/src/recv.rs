//! Byte-level receive state machine (C2), Fresenius variant.
//!
//! Reads are driven one byte at a time from the port thread; `ENQ`/`DC4`
//! flow control may interleave with an in-progress frame body and must be
//! answered within the device's watchdog window, which is why this cannot
//! wait for a whole frame before reacting.

use std::time::SystemTime;

use crate::error::{AppError, LinkError};
use crate::events::{EventBus, SpontEvent};
use crate::frame::{self, DecodedFrame};
use crate::gate::Gate;
use crate::ids::ReplyStatus;
use crate::reply::{Reply, ReplyError, ReplyMailbox};
use crate::trace::TraceSink;
use crate::txqueue::{TxClass, TxQueue};

/// The collaborators a single inbound byte may need to touch.
pub struct Dispatch<'a> {
    pub tx: &'a TxQueue,
    pub mailbox: &'a ReplyMailbox,
    pub events: &'a EventBus,
    pub gate: &'a Gate,
    pub trace: &'a dyn TraceSink,
}

#[derive(Debug, Default)]
pub struct Receiver {
    inside_frame: bool,
    inside_nak: bool,
    buffer: Vec<u8>,
}

impl Receiver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, byte: u8, d: &Dispatch<'_>) {
        if byte == frame::ENQ {
            if !d.tx.try_enqueue(TxClass::FlowControl, vec![frame::DC4]) {
                d.trace.trace("tx queue full, dropped DC4 keep-alive reply");
            }
            return;
        }
        if self.inside_nak {
            self.inside_nak = false;
            let err = LinkError::from_wire(byte);
            d.trace.trace(&format!("protocol error: {err}"));
            d.mailbox.deliver(Reply { origin: b'0', body: Err(ReplyError::Link(err)) });
            d.gate.release();
            return;
        }
        match byte {
            frame::ACK => {}
            frame::NAK => self.inside_nak = true,
            frame::STX => {
                self.buffer.clear();
                self.inside_frame = true;
            }
            frame::ETX if self.inside_frame => {
                self.inside_frame = false;
                self.process_buffer(d);
            }
            b if self.inside_frame && (0x20..=0x7E).contains(&b) => {
                self.buffer.push(b);
            }
            _ if self.inside_frame => {
                d.trace.trace("control code inside open frame, sending NAK");
                d.tx.try_enqueue(TxClass::FlowControl, vec![frame::NAK, LinkError::ECtrl.to_wire()]);
                self.inside_frame = false;
                self.buffer.clear();
            }
            other => d.trace.trace(&format!("unexpected byte received: {other:#04x}")),
        }
    }

    fn process_buffer(&mut self, d: &Dispatch<'_>) {
        let raw = std::mem::take(&mut self.buffer);
        let decoded = frame::decode(&raw);
        if !decoded.checksum_ok {
            d.trace.trace("checksum error on inbound frame");
            d.tx.try_enqueue(TxClass::FlowControl, vec![frame::NAK, LinkError::EChecksum.to_wire()]);
            return;
        }
        d.tx.try_enqueue(TxClass::FlowControl, vec![frame::ACK]);
        self.dispatch_decoded(decoded, d);
    }

    fn dispatch_decoded(&self, decoded: DecodedFrame, d: &Dispatch<'_>) {
        dispatch_decoded(decoded, d, frame::encode);
    }
}

/// Shared status-classification logic (C4/C5) for any framing scheme:
/// deliver command replies and release the gate, or acknowledge and echo a
/// spontaneous event and publish it. `encode_frame` builds the transport's
/// own echo frame (Fresenius `STX..ETX` or Alaris `!..|CRC\r`).
pub fn dispatch_decoded(decoded: DecodedFrame, d: &Dispatch<'_>, encode_frame: impl Fn(&[u8]) -> Vec<u8>) {
    let origin = decoded.origin.unwrap_or(b'0');
    match decoded.status {
        ReplyStatus::Incorrect => {
            let code = decoded.payload.as_deref().unwrap_or(&[]);
            let err = AppError::from_code(code);
            d.trace.trace(&format!("command error: {err}"));
            d.mailbox.deliver(Reply { origin, body: Err(ReplyError::App(err)) });
            d.gate.release();
        }
        ReplyStatus::Correct => {
            d.mailbox.deliver(Reply { origin, body: Ok(decoded.payload.unwrap_or_default()) });
            d.gate.release();
        }
        ReplyStatus::Spontaneous | ReplyStatus::SpontaneousAdjustable => {
            let echo_body = vec![origin, decoded.status.to_wire()];
            d.tx.try_enqueue(TxClass::Spontaneous, encode_frame(&echo_body));
            if let Some(addr) = decoded.origin_addr() {
                d.events.publish(SpontEvent {
                    timestamp: SystemTime::now(),
                    origin: addr,
                    payload: decoded.payload.unwrap_or_default(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::NullTraceSink;

    struct Fixture {
        tx: TxQueue,
        mailbox: ReplyMailbox,
        events: EventBus,
        gate: Gate,
        trace: NullTraceSink,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                tx: TxQueue::new(16),
                mailbox: ReplyMailbox::new(),
                events: EventBus::new(),
                gate: Gate::new(),
                trace: NullTraceSink,
            }
        }

        fn dispatch(&self) -> Dispatch<'_> {
            Dispatch { tx: &self.tx, mailbox: &self.mailbox, events: &self.events, gate: &self.gate, trace: &self.trace }
        }

        fn feed_all(&self, recv: &mut Receiver, bytes: &[u8]) {
            let d = self.dispatch();
            for &b in bytes {
                recv.feed(b, &d);
            }
        }
    }

    #[test]
    fn enq_always_queues_dc4_first() {
        let fx = Fixture::new();
        let mut recv = Receiver::new();
        fx.gate.acquire();
        fx.tx.try_enqueue(TxClass::Command, vec![0xAA]);
        fx.feed_all(&mut recv, &[frame::ENQ]);
        assert_eq!(fx.tx.dequeue(), Some(vec![frame::DC4]));
        assert_eq!(fx.tx.dequeue(), Some(vec![0xAA]));
    }

    #[test]
    fn correct_reply_delivers_to_mailbox_and_releases_gate() {
        let fx = Fixture::new();
        let mut recv = Receiver::new();
        fx.gate.acquire();
        let body = b"1C;r000003E8";
        let framed = frame::encode(body);
        fx.feed_all(&mut recv, &framed);
        assert_eq!(fx.tx.dequeue(), Some(vec![frame::ACK]));
        let reply = fx.mailbox.wait_until(std::time::Instant::now()).unwrap();
        assert_eq!(reply.body.unwrap(), b"r000003E8");
        assert!(!fx.gate.release());
    }

    #[test]
    fn spontaneous_event_is_acked_echoed_and_published() {
        let fx = Fixture::new();
        let mut recv = Receiver::new();
        let body = b"2E;r000007D0";
        let framed = frame::encode(body);
        fx.feed_all(&mut recv, &framed);
        assert_eq!(fx.tx.dequeue(), Some(vec![frame::ACK]));
        let echo = fx.tx.dequeue().unwrap();
        assert_eq!(echo, frame::encode(b"2E"));
    }

    #[test]
    fn bad_checksum_yields_nak_and_no_reply() {
        let fx = Fixture::new();
        let mut recv = Receiver::new();
        let mut framed = frame::encode(b"1C;r000003E8");
        let chk_start = framed.len() - 3;
        framed[chk_start] = b'0';
        framed[chk_start + 1] = b'0';
        fx.feed_all(&mut recv, &framed);
        assert_eq!(fx.tx.dequeue(), Some(vec![frame::NAK, LinkError::EChecksum.to_wire()]));
    }

    #[test]
    fn nak_error_code_delivers_errored_reply_and_releases_gate() {
        let fx = Fixture::new();
        let mut recv = Receiver::new();
        fx.gate.acquire();
        fx.feed_all(&mut recv, &[frame::NAK, 0x36]);
        let reply = fx.mailbox.wait_until(std::time::Instant::now()).unwrap();
        assert!(reply.body.is_err());
        assert!(!fx.gate.release());
    }
}
