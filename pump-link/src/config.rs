//! Port configuration. Threaded explicitly through `PortSession::open`
//! rather than hardcoded, mirroring `FreseniusComm`/`AlarisComm`'s
//! constructor parameters in the original source.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Even,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Seven,
    Eight,
}

/// Which byte-level receive state machine (C2) the port session should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Fresenius,
    Alaris,
}

#[derive(Debug, Clone)]
pub struct PortConfig {
    pub protocol: Protocol,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    /// Capacity of the bounded transmit queue (spec.md: 10-20).
    pub tx_queue_capacity: usize,
    /// Per-command deadline before a timeout reply is synthesized.
    pub command_timeout: Duration,
    /// How long the reader may block on a single byte read before polling
    /// for shutdown; does not affect protocol timing.
    pub read_poll_interval: Duration,
}

impl PortConfig {
    /// Fresenius Base/Module Primea: 19200 bps, 7E1.
    pub fn fresenius() -> Self {
        PortConfig {
            protocol: Protocol::Fresenius,
            baud_rate: 19200,
            data_bits: DataBits::Seven,
            parity: Parity::Even,
            tx_queue_capacity: 16,
            command_timeout: Duration::from_secs(1),
            read_poll_interval: Duration::from_millis(200),
        }
    }

    /// Alaris: 38400 bps, 8N1.
    pub fn alaris() -> Self {
        PortConfig {
            protocol: Protocol::Alaris,
            baud_rate: 38400,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            tx_queue_capacity: 16,
            command_timeout: Duration::from_secs(1),
            read_poll_interval: Duration::from_millis(200),
        }
    }
}
