//! Pronto / LIRC / Broadlink code translation.
//!
//! Pure, stateless conversion functions with no I/O. A Pronto "learned
//! code" is decoded into LIRC pulse widths (microseconds), which in turn
//! are packed into the Broadlink IR wire format.

use crate::error::CodecError;

/// Pronto timing unit: one carrier-period count is `codes[1] * 0.241246`
/// microseconds.
const PRONTO_CLOCK: f64 = 0.241246;

/// Decode a Pronto hex string (spaces tolerated) into raw bytes.
pub fn pronto_hex_to_bytes(pronto: &str) -> Result<Vec<u8>, CodecError> {
    let compact: String = pronto.split_whitespace().collect();
    hex::decode(&compact)
        .map_err(|e| CodecError::MalformedCode(format!("invalid pronto hex: {e}")))
}

/// Convert a Pronto "learned code" byte sequence into LIRC pulse widths.
///
/// The input is a sequence of big-endian 16-bit words: a 4-word preamble
/// (format flag, timing unit, one-shot length, repeat length) followed by
/// pulse-period counts. Only the learned-code format (first word zero) is
/// supported; the raw carrier-modulated format is rejected.
pub fn pronto2lirc(pronto: &[u8]) -> Result<Vec<u32>, CodecError> {
    let codes: Vec<u16> = pronto
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    if codes.first().copied() != Some(0) {
        return Err(CodecError::MalformedCode(
            "pronto code should start with 0000".into(),
        ));
    }
    if codes.len() < 4 {
        return Err(CodecError::MalformedCode(
            "pronto code shorter than its 4-word preamble".into(),
        ));
    }
    if codes.len() != 4 + 2 * (codes[2] as usize + codes[3] as usize) {
        return Err(CodecError::MalformedCode(
            "number of pulse widths does not match the preamble".into(),
        ));
    }
    if codes[1] == 0 {
        return Err(CodecError::MalformedCode(
            "pronto timing unit must be nonzero".into(),
        ));
    }

    // Cycles per microsecond for the declared carrier.
    let frequency = 1.0 / (f64::from(codes[1]) * PRONTO_CLOCK);

    Ok(codes[4..]
        .iter()
        .map(|&code| (f64::from(code) / frequency).round() as u32)
        .collect())
}

/// Pack LIRC pulse widths into a Broadlink IR packet.
///
/// Each pulse is rescaled from microseconds into Broadlink's internal tick
/// unit (`pulse * 269 / 8192`), encoded as one byte when it fits, or as a
/// zero marker followed by a big-endian u16 otherwise. The packet carries
/// the `0x26 0x00` IR-send opcode, a little-endian length, the pulse
/// array and the `0x0D 0x05` trailer.
pub fn lirc2broadlink(pulses: &[u32]) -> Vec<u8> {
    let mut array: Vec<u8> = Vec::new();
    for &pulse in pulses {
        let ticks = u64::from(pulse) * 269 / 8192;
        if ticks < 256 {
            array.push(ticks as u8);
        } else {
            array.push(0x00);
            array.extend_from_slice(&(ticks as u16).to_be_bytes());
        }
    }

    let mut packet: Vec<u8> = vec![0x26, 0x00];
    packet.extend_from_slice(&(array.len() as u16).to_le_bytes());
    packet.extend_from_slice(&array);
    packet.extend_from_slice(&[0x0D, 0x05]);

    // The transport adds a fixed 4-byte envelope before encrypting with a
    // 128-bit block cipher, so packet + 4 must land on a 16-byte boundary.
    let remainder = (packet.len() + 4) % 16;
    if remainder != 0 {
        packet.resize(packet.len() + (16 - remainder), 0x00);
    }
    packet
}
