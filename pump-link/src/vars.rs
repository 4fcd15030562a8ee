//! Decoding of `;`-separated variable values out of a reply payload, and the
//! fixed-point conversions for rate/volume.

use std::collections::HashMap;

use crate::ids::VarId;

pub fn parse_vars(payload: &[u8]) -> HashMap<VarId, Vec<u8>> {
    let mut out = HashMap::new();
    for chunk in payload.split(|&b| b == b';') {
        if chunk.is_empty() {
            continue;
        }
        if let Some(id) = VarId::from_wire(chunk[0]) {
            out.insert(id, chunk[1..].to_vec());
        }
    }
    out
}

fn hex_to_i64(bytes: &[u8]) -> Option<i64> {
    let text = std::str::from_utf8(bytes).ok()?;
    i64::from_str_radix(text, 16).ok()
}

fn round_to(x: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (x * factor).round() / factor
}

/// `mL/h`, one decimal place.
pub fn extract_rate(payload: &[u8]) -> Option<f64> {
    let vars = parse_vars(payload);
    let n = hex_to_i64(vars.get(&VarId::Rate)?)?;
    Some(round_to(n as f64 * 0.1, 1))
}

/// `mL`, three decimal places.
pub fn extract_volume(payload: &[u8]) -> Option<f64> {
    let vars = parse_vars(payload);
    let n = hex_to_i64(vars.get(&VarId::Volume)?)?;
    Some(round_to(n as f64 * 0.001, 3))
}
