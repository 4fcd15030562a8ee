//! Port session (C3/C4): owns the serial handle, the transmit queue, the
//! reader/writer threads, and orchestrates the one-in-flight command/reply
//! protocol on top of the gate.
//!
//! Reader and writer each hold an independent clone of the transport handle
//! (`try_clone`), rather than sharing one behind a lock, mirroring
//! `boards/host_emulation/src/uart.rs`'s split `tx_stream`/`rx_stream` and
//! the FT1.2 driver's `port.try_clone()` usage.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::alaris;
use crate::config::{PortConfig, Protocol};
use crate::error::{CommandError, CommunicationError};
use crate::events::{EventBus, SpontEvent};
use crate::frame;
use crate::gate::Gate;
use crate::recv::Dispatch;
use crate::reply::{deadline_from, ReplyError, ReplyMailbox};
use crate::trace::TraceSink;
use crate::txqueue::{TxClass, TxQueue};

/// Dispatches inbound bytes to whichever byte-level receiver (C2) matches
/// the port's wire protocol.
enum AnyReceiver {
    Fresenius(crate::recv::Receiver),
    Alaris(alaris::recv::Receiver),
}

impl AnyReceiver {
    fn new(protocol: Protocol) -> Self {
        match protocol {
            Protocol::Fresenius => AnyReceiver::Fresenius(crate::recv::Receiver::new()),
            Protocol::Alaris => AnyReceiver::Alaris(alaris::recv::Receiver::new()),
        }
    }

    fn feed(&mut self, byte: u8, d: &Dispatch<'_>) {
        match self {
            AnyReceiver::Fresenius(r) => r.feed(byte, d),
            AnyReceiver::Alaris(r) => r.feed(byte, d),
        }
    }
}

fn encode_for(protocol: Protocol, body: &[u8]) -> Vec<u8> {
    match protocol {
        Protocol::Fresenius => frame::encode(body),
        Protocol::Alaris => alaris::frame::encode(body),
    }
}

/// Minimal transport abstraction: anything duplex, `Send`, and cloneable
/// into an independent handle on the same underlying connection.
pub trait PortIo: Read + Write + Send {
    fn try_clone_io(&self) -> std::io::Result<Box<dyn PortIo>>;
}

impl PortIo for Box<dyn serialport::SerialPort> {
    fn try_clone_io(&self) -> std::io::Result<Box<dyn PortIo>> {
        let cloned = serialport::SerialPort::try_clone(self.as_ref())?;
        Ok(Box::new(cloned))
    }
}

impl PortIo for std::net::TcpStream {
    fn try_clone_io(&self) -> std::io::Result<Box<dyn PortIo>> {
        Ok(Box::new(self.try_clone()?))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PumpError {
    #[error(transparent)]
    Communication(#[from] CommunicationError),
    #[error(transparent)]
    Command(#[from] CommandError),
}

pub struct PortSession {
    tx: Arc<TxQueue>,
    gate: Arc<Gate>,
    mailbox: Arc<ReplyMailbox>,
    events: Arc<EventBus>,
    trace: Arc<dyn TraceSink>,
    config: PortConfig,
    running: Arc<AtomicBool>,
    reader_handle: Option<JoinHandle<()>>,
    writer_handle: Option<JoinHandle<()>>,
}

impl PortSession {
    /// Opens a real serial port with the given configuration.
    pub fn open(path: &str, config: PortConfig, trace: Arc<dyn TraceSink>) -> std::io::Result<Self> {
        use crate::config::{DataBits, Parity};
        let data_bits = match config.data_bits {
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        };
        let parity = match config.parity {
            Parity::None => serialport::Parity::None,
            Parity::Even => serialport::Parity::Even,
        };
        let port = serialport::new(path, config.baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(serialport::StopBits::One)
            .timeout(config.read_poll_interval)
            .open()?;
        Ok(Self::from_io(Box::new(port), config, trace))
    }

    /// Wraps an already-open transport. Used by `open` and by tests driving
    /// an in-process loopback.
    pub fn from_io(io: Box<dyn PortIo>, config: PortConfig, trace: Arc<dyn TraceSink>) -> Self {
        let tx = Arc::new(TxQueue::new(config.tx_queue_capacity));
        let gate = Arc::new(Gate::new());
        let mailbox = Arc::new(ReplyMailbox::new());
        let events = Arc::new(EventBus::new());
        let running = Arc::new(AtomicBool::new(true));

        let reader_io = io.try_clone_io().expect("transport must support try_clone");
        let writer_io = io;

        let reader_handle = {
            let tx = Arc::clone(&tx);
            let gate = Arc::clone(&gate);
            let mailbox = Arc::clone(&mailbox);
            let events = Arc::clone(&events);
            let trace = Arc::clone(&trace);
            let running = Arc::clone(&running);
            let protocol = config.protocol;
            let collaborators = ReaderCollaborators { tx, gate, mailbox, events, trace, running };
            thread::spawn(move || reader_loop(reader_io, protocol, collaborators))
        };

        let writer_handle = {
            let tx = Arc::clone(&tx);
            thread::spawn(move || writer_loop(writer_io, tx))
        };

        PortSession {
            tx,
            gate,
            mailbox,
            events,
            trace,
            config,
            running,
            reader_handle: Some(reader_handle),
            writer_handle: Some(writer_handle),
        }
    }

    pub fn subscribe_events(&self) -> std::sync::mpsc::Receiver<SpontEvent> {
        self.events.subscribe()
    }

    /// The transmit queue, shared with a `Looper` so keep-alive frames take
    /// the same `FlowControl` lane as `ENQ` replies.
    pub fn tx_queue(&self) -> Arc<TxQueue> {
        Arc::clone(&self.tx)
    }

    /// Command/reply pairing (C4): one-in-flight, 1-second deadline, one
    /// retry on a transient link error or timeout.
    pub fn exec_raw(&self, body: &[u8]) -> Result<Vec<u8>, PumpError> {
        self.gate.acquire();
        let mut attempt = 0;
        loop {
            let framed = encode_for(self.config.protocol, body);
            if !self.tx.try_enqueue(TxClass::Command, framed) {
                self.gate.release();
                return Err(CommunicationError::QueueFull.into());
            }

            let deadline = deadline_from(self.config.command_timeout);
            match self.mailbox.wait_until(deadline) {
                Some(reply) => match reply.body {
                    Ok(payload) => return Ok(payload),
                    Err(ReplyError::App(app_err)) => return Err(CommandError(app_err).into()),
                    Err(ReplyError::Link(link_err)) => {
                        if link_err.is_transient() && attempt == 0 {
                            attempt += 1;
                            self.trace.trace(&format!("{link_err}, retrying command"));
                            self.gate.acquire();
                            continue;
                        }
                        return Err(CommunicationError::Link(link_err).into());
                    }
                },
                None => {
                    self.gate.release();
                    if attempt == 0 {
                        attempt += 1;
                        self.trace.trace("command timed out, retrying");
                        self.gate.acquire();
                        continue;
                    }
                    return Err(CommunicationError::Timeout.into());
                }
            }
        }
    }
}

impl Drop for PortSession {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.tx.close();
        if let Some(h) = self.reader_handle.take() {
            let _ = h.join();
        }
        if let Some(h) = self.writer_handle.take() {
            let _ = h.join();
        }
    }
}

/// The reader thread's shared collaborators, bundled to keep `reader_loop`
/// under clippy's argument-count lint.
struct ReaderCollaborators {
    tx: Arc<TxQueue>,
    gate: Arc<Gate>,
    mailbox: Arc<ReplyMailbox>,
    events: Arc<EventBus>,
    trace: Arc<dyn TraceSink>,
    running: Arc<AtomicBool>,
}

fn reader_loop(mut io: Box<dyn PortIo>, protocol: Protocol, c: ReaderCollaborators) {
    let mut receiver = AnyReceiver::new(protocol);
    let mut byte = [0u8; 1];
    while c.running.load(Ordering::SeqCst) {
        match io.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                let dispatch =
                    Dispatch { tx: &c.tx, mailbox: &c.mailbox, events: &c.events, gate: &c.gate, trace: c.trace.as_ref() };
                receiver.feed(byte[0], &dispatch);
            }
            Err(e) if matches!(e.kind(), std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock) => continue,
            Err(_) => break,
        }
    }
}

fn writer_loop(mut io: Box<dyn PortIo>, tx: Arc<TxQueue>) {
    while let Some(frame) = tx.dequeue() {
        if io.write_all(&frame).is_err() {
            break;
        }
        let _ = io.flush();
    }
}
