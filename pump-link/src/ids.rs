//! Closed code sets used on the wire: commands, variable identifiers, and
//! reply status classifiers. Each is a tagged enum with `to_wire`/`from_wire`
//! rather than a raw byte, per the dynamic-dispatch-to-tagged-variant
//! convention used throughout this crate.

/// Two-letter command opcodes understood by both the Fresenius and Alaris
/// transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Connect,
    Disconnect,
    Mode,
    Reset,
    Off,
    Silence,
    SetDrug,
    ReadDrug,
    ShowDrug,
    SetId,
    ReadId,
    EnableSpont,
    DisableSpont,
    ReadVar,
    EnableSpontAdj,
    DisableSpontAdj,
    ReadAdj,
    ReadFixed,
    SetRate,
    SetPause,
    SetBolus,
    SetEmpty,
    SetLimVolume,
    ResetVolume,
    PressureLim,
    DynPressure,
}

impl Command {
    pub fn to_wire(self) -> &'static [u8; 2] {
        match self {
            Command::Connect => b"DC",
            Command::Disconnect => b"FC",
            Command::Mode => b"MO",
            Command::Reset => b"RZ",
            Command::Off => b"OF",
            Command::Silence => b"SI",
            Command::SetDrug => b"EP",
            Command::ReadDrug => b"LP",
            Command::ShowDrug => b"AP",
            Command::SetId => b"EN",
            Command::ReadId => b"LN",
            Command::EnableSpont => b"DE",
            Command::DisableSpont => b"AE",
            Command::ReadVar => b"LE",
            Command::EnableSpontAdj => b"DM",
            Command::DisableSpontAdj => b"AM",
            Command::ReadAdj => b"LM",
            Command::ReadFixed => b"LF",
            Command::SetRate => b"PR",
            Command::SetPause => b"PO",
            Command::SetBolus => b"PB",
            Command::SetEmpty => b"PF",
            Command::SetLimVolume => b"PV",
            Command::ResetVolume => b"RV",
            Command::PressureLim => b"PP",
            Command::DynPressure => b"PS",
        }
    }
}

/// Single-byte variable identifiers used with `ReadVar`/`EnableSpont`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarId {
    Alarm,
    Error,
    Mode,
    Rate,
    Volume,
    BolusRate,
    BolusVolume,
    NumModules,
    Modules,
}

impl VarId {
    pub fn to_wire(self) -> u8 {
        match self {
            VarId::Alarm => b'a',
            VarId::Error => b'e',
            VarId::Mode => b'm',
            VarId::Rate => b'd',
            VarId::Volume => b'r',
            VarId::BolusRate => b'k',
            VarId::BolusVolume => b's',
            VarId::NumModules => b'i',
            VarId::Modules => b'b',
        }
    }

    pub fn from_wire(b: u8) -> Option<Self> {
        Some(match b {
            b'a' => VarId::Alarm,
            b'e' => VarId::Error,
            b'm' => VarId::Mode,
            b'd' => VarId::Rate,
            b'r' => VarId::Volume,
            b'k' => VarId::BolusRate,
            b's' => VarId::BolusVolume,
            b'i' => VarId::NumModules,
            b'b' => VarId::Modules,
            _ => return None,
        })
    }
}

/// Fixed-variable identifiers used with `ReadFixed` (`LF`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixedVarId {
    DeviceType,
}

impl FixedVarId {
    pub fn to_wire(self) -> u8 {
        match self {
            FixedVarId::DeviceType => b'b',
        }
    }
}

/// One-character status classifier attached to every non-link-control reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Correct,
    Incorrect,
    Spontaneous,
    SpontaneousAdjustable,
}

impl ReplyStatus {
    pub fn from_wire(b: u8) -> Option<Self> {
        Some(match b {
            b'C' => ReplyStatus::Correct,
            b'I' => ReplyStatus::Incorrect,
            b'E' => ReplyStatus::Spontaneous,
            b'M' => ReplyStatus::SpontaneousAdjustable,
            _ => return None,
        })
    }

    pub fn to_wire(self) -> u8 {
        match self {
            ReplyStatus::Correct => b'C',
            ReplyStatus::Incorrect => b'I',
            ReplyStatus::Spontaneous => b'E',
            ReplyStatus::SpontaneousAdjustable => b'M',
        }
    }

    /// Status codes that carry a device-initiated notification rather than
    /// a reply to a host command.
    pub fn is_spontaneous(self) -> bool {
        matches!(self, ReplyStatus::Spontaneous | ReplyStatus::SpontaneousAdjustable)
    }
}
