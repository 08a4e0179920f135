//! CRC8 engine for ESP3 frames.
//!
//! ESP3 protects the frame header and the body with the same 8-bit CRC:
//! polynomial 0x07, initial value 0x00, no reflection. That parameterization
//! is the standard SMBus CRC, so the checksum is delegated to the `crc`
//! crate's precomputed table rather than hand-rolled.

use crc::{CRC_8_SMBUS, Crc};

const CRC8_ESP3: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

/// Compute the ESP3 CRC8 over a byte sequence.
///
/// Pure and deterministic; any input is valid, including the empty slice.
/// Used for both the 4-byte header (lengths + packet type) and the body
/// (data followed by optional data).
pub fn crc8(bytes: &[u8]) -> u8 {
    CRC8_ESP3.checksum(bytes)
}
