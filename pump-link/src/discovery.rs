//! Module discovery (C7): keeps the set of attached `Syringe` handles in
//! sync with the Base's 5-bit module bitmap.
//!
//! A disappeared module's `Syringe` is simply dropped from the map; a
//! re-appearing module is attached fresh and must re-register any event
//! subscriptions, since they are volatile on the device. This is the
//! arena-index design note's safety property (a stale handle fails cleanly)
//! realized through ordinary ownership rather than a generation counter: a
//! dropped `Syringe` cannot be looked up again.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::ids::VarId;
use crate::port::PumpError;
use crate::session::{Base, Device, Syringe};

pub struct Supervisor {
    base: Base,
    modules: HashMap<u8, Syringe>,
    /// Event subscriptions to restore when a module re-appears.
    subscriptions: HashMap<u8, HashSet<VarId>>,
}

impl Supervisor {
    pub fn new(base: Base) -> Self {
        Supervisor { base, modules: HashMap::new(), subscriptions: HashMap::new() }
    }

    pub fn base(&self) -> &Base {
        &self.base
    }

    pub fn module(&self, index: u8) -> Option<&Syringe> {
        self.modules.get(&index)
    }

    /// Polls `LE;b` once and reconciles the attached-module set.
    pub fn poll_once(&mut self) -> Result<(), PumpError> {
        let present: HashSet<u8> = self.base.list_modules()?.into_iter().collect();

        let gone: Vec<u8> = self.modules.keys().copied().filter(|i| !present.contains(i)).collect();
        for index in gone {
            self.modules.remove(&index);
        }

        for index in present {
            if self.modules.contains_key(&index) {
                continue;
            }
            let port = Arc::clone(self.base.port());
            let syringe = Syringe::attach(port, index)?;
            if let Some(events) = self.subscriptions.get(&index) {
                for &event in events {
                    syringe.register_event(event)?;
                }
            }
            self.modules.insert(index, syringe);
        }

        Ok(())
    }

    pub fn register_event(&mut self, index: u8, event: VarId) -> Result<(), PumpError> {
        if let Some(syringe) = self.modules.get(&index) {
            syringe.register_event(event)?;
        }
        self.subscriptions.entry(index).or_default().insert(event);
        Ok(())
    }
}
