//! CRC-8 checksum validation for Omni messages

use super::types::FRAME_BYTES;

/// CRC-8 polynomial used by the Omni protocol (0x97)
const CRC8_POLY: u8 = 0x97;

/// Number of frame bytes covered by the checksum (everything before the CRC byte)
pub const CRC_COVERED_BYTES: usize = FRAME_BYTES - 1;

/// Compute the CRC-8 checksum over message bytes
///
/// MSB-first, initial remainder 0x00, no reflection, no final XOR.
pub fn compute_crc8(msg: &[u8]) -> u8 {
    let mut crc: u8 = 0;

    for &byte in msg {
        crc ^= byte;

        for _ in 0..8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ CRC8_POLY;
            } else {
                crc <<= 1;
            }
        }
    }

    crc
}

/// Check CRC validity of a 10-byte Omni frame
///
/// The checksum covers bytes 0..9 and is carried in byte 9.
/// Returns Ok(()) if valid, Err(()) if invalid.
pub fn check_crc(msg: &[u8]) -> Result<(), ()> {
    if msg.len() != FRAME_BYTES {
        return Err(());
    }

    if compute_crc8(&msg[..CRC_COVERED_BYTES]) == msg[CRC_COVERED_BYTES] {
        Ok(())
    } else {
        Err(())
    }
}
