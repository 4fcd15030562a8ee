//! Link- and session-layer driver for a Fresenius Module DPS/Base Primea
//! infusion-pump rack, with a secondary Alaris binding.
//!
//! This crate owns everything between a raw serial port and a caller asking
//! for a syringe's infused volume or its attached-module bitmap: the frame
//! codec, the byte-level receive state machine, the command/reply gate, the
//! transmit queue, the spontaneous-event side channel, and module discovery.
//! It does not pick infusion rates or make clinical decisions.

pub mod alaris;
pub mod config;
pub mod discovery;
pub mod error;
pub mod events;
pub mod frame;
pub mod gate;
pub mod ids;
pub mod port;
pub mod recv;
pub mod reply;
pub mod session;
pub mod trace;
pub mod txqueue;
pub mod vars;

pub use config::{DataBits, Parity, PortConfig, Protocol};
pub use error::{AppError, CommandError, CommunicationError, LinkError};
pub use events::SpontEvent;
pub use ids::{Command, FixedVarId, VarId};
pub use port::{PortSession, PumpError};
pub use session::{Base, Device, Syringe};
pub use trace::{LogTraceSink, NullTraceSink, TraceSink};
