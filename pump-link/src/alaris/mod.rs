//! Alaris binding: frame codec, byte-level receiver, and the remote-control
//! keep-alive ticker, plus a `Device` wrapper that owns the `Looper`.

pub mod frame;
pub mod looper;
pub mod recv;

use std::time::Duration;

use crate::ids::Command;
use crate::port::PumpError;
use crate::session::{Device, Syringe};
use looper::Looper;

/// An Alaris pump reached through the same `Syringe`/`Device` surface as a
/// Fresenius module, with a `Looper` granting remote control for as long as
/// this handle is alive.
pub struct AlarisPump {
    inner: Syringe,
    looper: Looper,
}

impl AlarisPump {
    /// Reads the device serial number, derives the remote-control security
    /// code from it, and starts the keep-alive ticker.
    pub fn attach(inner: Syringe) -> Result<Self, PumpError> {
        inner.connect()?;
        let serial = inner.exec(Command::ReadFixed, &[], &[b"c" as &[u8]])?;
        let sec_code = looper::sec_code(&serial);
        let tx = inner.port().tx_queue();
        let looper = Looper::start(tx, sec_code, Duration::from_secs(1));
        Ok(AlarisPump { inner, looper })
    }

    pub fn disable_remote(&self) {
        self.looper.disable();
    }
}

impl Device for AlarisPump {
    fn port(&self) -> &std::sync::Arc<crate::port::PortSession> {
        self.inner.port()
    }
    fn address(&self) -> u8 {
        self.inner.address()
    }
    fn events(&self) -> &std::sync::Mutex<std::collections::HashSet<crate::ids::VarId>> {
        self.inner.events()
    }
}
