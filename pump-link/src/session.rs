//! Session layer (C6): stateful syringe/base wrappers over a `PortSession`.
//!
//! `Device` is the capability shared by `Syringe` and `Base` (and, via the
//! same surface, the Alaris binding) in place of the inheritance hierarchy
//! (`FreseniusSyringe` -> `FreseniusBase`) in the original source.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::error::CommunicationError;
use crate::ids::{Command, VarId};
use crate::port::{PortSession, PumpError};
use crate::vars;

pub trait Device {
    fn port(&self) -> &Arc<PortSession>;
    fn address(&self) -> u8;
    fn events(&self) -> &Mutex<HashSet<VarId>>;

    fn exec(&self, command: Command, flags: &[VarId], args: &[&[u8]]) -> Result<Vec<u8>, PumpError> {
        let mut body = vec![self.address()];
        body.extend_from_slice(command.to_wire());
        if !flags.is_empty() {
            body.push(b';');
            body.extend(flags.iter().map(|f| f.to_wire()));
        } else if !args.is_empty() {
            body.push(b';');
            for (i, a) in args.iter().enumerate() {
                if i > 0 {
                    body.push(b';');
                }
                body.extend_from_slice(a);
            }
        }
        self.port().exec_raw(&body)
    }

    fn connect(&self) -> Result<(), PumpError> {
        self.exec(Command::Connect, &[], &[]).map(|_| ())
    }

    /// Errors are swallowed: a disconnect on an already-disconnected device
    /// is not actionable for the caller.
    fn disconnect(&self) {
        let _ = self.exec(Command::Disconnect, &[], &[]);
    }

    fn read_rate(&self) -> Result<f64, PumpError> {
        let payload = self.exec(Command::ReadVar, &[VarId::Rate], &[])?;
        vars::extract_rate(&payload)
            .ok_or_else(|| CommunicationError::Protocol("missing rate variable".into()).into())
    }

    fn read_volume(&self) -> Result<f64, PumpError> {
        let payload = self.exec(Command::ReadVar, &[VarId::Volume], &[])?;
        vars::extract_volume(&payload)
            .ok_or_else(|| CommunicationError::Protocol("missing volume variable".into()).into())
    }

    fn read_drug(&self) -> Result<Vec<u8>, PumpError> {
        self.exec(Command::ReadDrug, &[], &[])
    }

    fn reset_volume(&self) -> Result<(), PumpError> {
        self.exec(Command::ResetVolume, &[], &[]).map(|_| ())
    }

    fn read_device_type(&self) -> Result<Vec<u8>, PumpError> {
        self.exec(Command::ReadFixed, &[], &[b"b" as &[u8]])
    }

    fn register_event(&self, event: VarId) -> Result<(), PumpError> {
        self.events().lock().unwrap().insert(event);
        let flags: Vec<VarId> = self.events().lock().unwrap().iter().copied().collect();
        self.exec(Command::EnableSpont, &flags, &[]).map(|_| ())
    }

    fn unregister_event(&self, event: VarId) -> Result<(), PumpError> {
        self.events().lock().unwrap().remove(&event);
        self.exec(Command::DisableSpont, &[], &[])?;
        let flags: Vec<VarId> = self.events().lock().unwrap().iter().copied().collect();
        self.exec(Command::EnableSpont, &flags, &[]).map(|_| ())
    }

    fn clear_events(&self) -> Result<(), PumpError> {
        self.events().lock().unwrap().clear();
        self.exec(Command::DisableSpont, &[], &[]).map(|_| ())
    }
}

/// A module/syringe at rack address `1..=5`, or a standalone unit when
/// constructed directly rather than through `Base::list_modules`.
pub struct Syringe {
    port: Arc<PortSession>,
    address: u8,
    events: Mutex<HashSet<VarId>>,
}

impl Syringe {
    /// Constructs and connects a syringe at the given module index (`1..=5`).
    pub fn attach(port: Arc<PortSession>, index: u8) -> Result<Self, PumpError> {
        let syringe = Syringe { port, address: b'0' + index, events: Mutex::new(HashSet::new()) };
        syringe.connect()?;
        Ok(syringe)
    }

    pub fn index(&self) -> u8 {
        self.address - b'0'
    }
}

impl Device for Syringe {
    fn port(&self) -> &Arc<PortSession> {
        &self.port
    }
    fn address(&self) -> u8 {
        self.address
    }
    fn events(&self) -> &Mutex<HashSet<VarId>> {
        &self.events
    }
}

impl Drop for Syringe {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// The rack controller at address `0`, with module discovery in addition to
/// the shared `Device` surface.
pub struct Base {
    syringe: Syringe,
}

impl Base {
    /// Connects to the Base. Per spec.md §4.6, callers should wait ~1s after
    /// first connect before discovery to let the device stabilize; `wait`
    /// performs that sleep inline.
    pub fn attach(port: Arc<PortSession>, wait: bool) -> Result<Self, PumpError> {
        let syringe = Syringe { port, address: b'0', events: Mutex::new(HashSet::new()) };
        syringe.connect()?;
        if wait {
            thread::sleep(Duration::from_secs(1));
        }
        Ok(Base { syringe })
    }

    /// Module indices (`1..=5`) currently present, per the 5-bit bitmap
    /// exposed by `LE;b`.
    pub fn list_modules(&self) -> Result<Vec<u8>, PumpError> {
        let payload = self.exec(Command::ReadVar, &[VarId::Modules], &[])?;
        let fields = vars::parse_vars(&payload);
        let hex = fields
            .get(&VarId::Modules)
            .ok_or_else(|| CommunicationError::Protocol("missing modules bitmap".into()))?;
        let text = std::str::from_utf8(hex)
            .map_err(|_| CommunicationError::Protocol("non-UTF8 modules bitmap".into()))?;
        let bitmap = u8::from_str_radix(text, 16)
            .map_err(|_| CommunicationError::Protocol("non-hex modules bitmap".into()))?;
        Ok((0..5u8).filter(|i| bitmap & (1 << i) != 0).map(|i| i + 1).collect())
    }
}

impl Device for Base {
    fn port(&self) -> &Arc<PortSession> {
        self.syringe.port()
    }
    fn address(&self) -> u8 {
        self.syringe.address()
    }
    fn events(&self) -> &Mutex<HashSet<VarId>> {
        self.syringe.events()
    }
}
