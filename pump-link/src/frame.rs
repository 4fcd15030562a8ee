//! Fresenius frame codec (C1): `STX | body | CHK | ETX`, plus the link
//! control bytes shared with the receive state machine (C2).

use crate::ids::ReplyStatus;

pub const STX: u8 = 0x02;
pub const ETX: u8 = 0x03;
pub const ACK: u8 = 0x06;
pub const NAK: u8 = 0x15;
pub const ENQ: u8 = 0x05;
pub const DC4: u8 = 0x14;

/// A frame body decoded off the wire (with STX/ETX/checksum already
/// stripped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub status: ReplyStatus,
    /// Raw origin digit byte (`b'0'..=b'5'`), absent on single-character
    /// meta fields.
    pub origin: Option<u8>,
    pub payload: Option<Vec<u8>>,
    pub checksum_ok: bool,
}

impl DecodedFrame {
    /// Parses the origin digit into a module address, if present and a
    /// decimal digit.
    pub fn origin_addr(&self) -> Option<u8> {
        self.origin.filter(u8::is_ascii_digit).map(|b| b - b'0')
    }
}

/// `(0xFF - (sum(body) mod 0x100))` as a 2-digit uppercase hex pair.
pub fn checksum(body: &[u8]) -> [u8; 2] {
    let sum: u32 = body.iter().map(|&b| b as u32).sum();
    let low = (sum % 0x100) as u8;
    let chk = 0xFFu8.wrapping_sub(low);
    let hex = format!("{chk:02X}");
    let hex = hex.as_bytes();
    [hex[0], hex[1]]
}

/// Builds a complete outbound frame: `STX | body | CHK | ETX`.
pub fn encode(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 4);
    out.push(STX);
    out.extend_from_slice(body);
    out.extend_from_slice(&checksum(body));
    out.push(ETX);
    out
}

/// Decodes a body already stripped of its surrounding `STX`/`ETX`.
///
/// `raw` must include the trailing 2-byte checksum. Malformed input (too
/// short to hold a checksum) is reported with `checksum_ok = false` and an
/// `Incorrect` status rather than panicking, since it originates from the
/// wire.
pub fn decode(raw: &[u8]) -> DecodedFrame {
    if raw.len() < 2 {
        return DecodedFrame {
            status: ReplyStatus::Incorrect,
            origin: None,
            payload: None,
            checksum_ok: false,
        };
    }
    let (body, chk) = raw.split_at(raw.len() - 2);
    let checksum_ok = chk == checksum(body);

    let mut parts = body.splitn(2, |&b| b == b';');
    let meta = parts.next().unwrap_or(&[]);
    let payload = parts.next().map(<[u8]>::to_vec);

    let (origin, status_byte) = if meta.len() >= 2 {
        (Some(meta[0]), meta[1])
    } else if let Some(&b) = meta.first() {
        (None, b)
    } else {
        (None, 0)
    };
    let status = ReplyStatus::from_wire(status_byte).unwrap_or(ReplyStatus::Incorrect);

    DecodedFrame { status, origin, payload, checksum_ok }
}
