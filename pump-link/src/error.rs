//! Two-tier error taxonomy (C9).
//!
//! Link-layer errors follow a `NAK`; application-layer errors follow an `I`
//! status reply. The two tiers are kept as separate enums (rather than one
//! flat code space) so a duplicate code in one tier can never shadow a
//! meaning in the other.

use thiserror::Error as ThisError;

/// Link-layer error code, sent by the device as the single byte following a
/// `NAK` (0x15).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum LinkError {
    #[error("Character Reception Problem")]
    EChar,
    #[error("Incorrect Check-sum")]
    EChecksum,
    #[error("Incorrect Address")]
    EAddr,
    #[error("End of [ACK] Character time-out")]
    ETimeout,
    #[error("Receiver not Ready")]
    ERnr,
    #[error("Incorrect Frame Length")]
    EFrame,
    #[error("Presence of Control Code")]
    ECtrl,
    #[error("Unknown link-layer error code {0:#04x}")]
    Undefined(u8),
}

impl LinkError {
    pub fn from_wire(b: u8) -> Self {
        match b {
            0x31 => LinkError::EChar,
            0x32 => LinkError::EChecksum,
            0x34 => LinkError::EAddr,
            0x35 => LinkError::ETimeout,
            0x36 => LinkError::ERnr,
            0x37 => LinkError::EFrame,
            0x38 => LinkError::ECtrl,
            other => LinkError::Undefined(other),
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            LinkError::EChar => 0x31,
            LinkError::EChecksum => 0x32,
            LinkError::EAddr => 0x34,
            LinkError::ETimeout => 0x35,
            LinkError::ERnr => 0x36,
            LinkError::EFrame => 0x37,
            LinkError::ECtrl => 0x38,
            LinkError::Undefined(b) => b,
        }
    }

    /// Transient codes that the command/reply gate (C4) retries exactly once.
    pub fn is_transient(self) -> bool {
        matches!(self, LinkError::ERnr | LinkError::ETimeout)
    }
}

/// Application-layer error code, carried as a 2-character hex string in the
/// payload of an `I`-status reply.
///
/// `0x1F` ("ENotManual") is documented upstream under two different
/// meanings in some code revisions; this crate keeps only the
/// "module not in the manual mode" reading, matching the Alaris taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum AppError {
    #[error("Unknown Command")]
    EUnknown,
    #[error("Command disabled in the current Mode")]
    ECmdMode,
    #[error("Command disabled in this status")]
    ECmdStat,
    #[error("Syntax Error")]
    ESyntax,
    #[error("Operating Mode not Authorized")]
    EModeAuth,
    #[error("Operating Mode already active")]
    EModeAgain,
    #[error("New operating mode disabled in this mode")]
    EModeMode,
    #[error("Parameter out off limit")]
    ELimit,
    #[error("New operating mode disabled in this status")]
    EModeStat,
    #[error("Identifier not used")]
    EIdentU,
    #[error("Identifier incorrect")]
    EIdentI,
    #[error("Message too long")]
    EMsgLong,
    #[error("Communication session with the base not open")]
    EComBase,
    #[error("Communication with module impossible")]
    EComModuleI,
    #[error("Presence of an Alarm")]
    EAlarm,
    #[error("Attempt to launch infusion before flow rate selection")]
    ERate,
    #[error("Insufficient Volume to launch a bolus")]
    EVolume,
    #[error("Impossible to launch the empty Syringe mode")]
    EEmptyMode,
    #[error("Recorded event number incorrect")]
    EEvent,
    #[error("The Communication with the module is not open")]
    EComModule,
    #[error("One of the modules is not in the manual mode")]
    ENotManual,
    #[error("Command not authorized with this Port")]
    EPortAuth,
    #[error("New mode unauthorized")]
    ENModeAuth,
    #[error("Connection Mode incorrect")]
    EConModeI,
    #[error("Drug number incorrect")]
    EDrug,
    #[error("Unknown Error ({0})")]
    Undefined(u8),
}

impl AppError {
    /// Parse the 2-character hex code carried in an `I`-status payload.
    pub fn from_code(code: &[u8]) -> Self {
        let Ok(text) = std::str::from_utf8(code) else {
            return AppError::Undefined(0);
        };
        let Ok(n) = u8::from_str_radix(text, 16) else {
            return AppError::Undefined(0);
        };
        match n {
            0x01 => AppError::EUnknown,
            0x02 => AppError::ECmdMode,
            0x03 => AppError::ECmdStat,
            0x04 => AppError::ESyntax,
            0x05 => AppError::EModeAuth,
            0x06 => AppError::EModeAgain,
            0x07 => AppError::EModeMode,
            0x08 => AppError::ELimit,
            0x09 => AppError::EModeStat,
            0x0A => AppError::EIdentU,
            0x0B => AppError::EIdentI,
            0x0C => AppError::EMsgLong,
            0x0D => AppError::EComBase,
            0x0E => AppError::EComModuleI,
            0x12 => AppError::EAlarm,
            0x14 => AppError::ERate,
            0x15 => AppError::EVolume,
            0x16 => AppError::EEmptyMode,
            0x1A => AppError::EEvent,
            0x1E => AppError::EComModule,
            0x1F => AppError::ENotManual,
            0x20 => AppError::EPortAuth,
            0x22 => AppError::ENModeAuth,
            0x24 => AppError::EConModeI,
            0x25 => AppError::EDrug,
            other => AppError::Undefined(other),
        }
    }
}

/// Surfaced when the link itself is broken: repeated timeouts, a closed
/// port, or checksum failures that never recover. Consumers should drop the
/// session.
#[derive(Debug, ThisError)]
pub enum CommunicationError {
    #[error("serial port error: {0}")]
    Port(#[from] std::io::Error),
    #[error("command timed out and the retry also timed out")]
    Timeout,
    #[error("link-layer error after retry: {0}")]
    Link(LinkError),
    #[error("tx queue is full")]
    QueueFull,
    #[error("port session is shutting down")]
    Closed,
    #[error("malformed reply payload: {0}")]
    Protocol(String),
}

/// Surfaced when the device understood the command but refused or could not
/// fulfill it. Consumers may retry at the policy level.
#[derive(Debug, Clone, Copy, ThisError)]
#[error("command error: {0}")]
pub struct CommandError(#[from] pub AppError);
