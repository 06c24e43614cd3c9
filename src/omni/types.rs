//! Omni message types

use serde::Serialize;
use thiserror::Error;

/// Length of one complete Omni message
pub const FRAME_BYTES: usize = 10;

/// Nominal message length in bits
pub const FRAME_BITS: u16 = 80;

/// Maximum accepted row length; demodulation jitter can append up to 2 bits
pub const FRAME_BITS_MAX: u16 = 82;

/// Minimum identical repeats required to accept a row (4 are transmitted)
pub const MIN_REPEATS: usize = 2;

/// Decode failure conditions
///
/// All three are per-message and recoverable: the transmission is dropped and
/// the next one starts fresh.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// No row repeated often enough at the expected length
    #[error("no repeated row of the expected length")]
    FrameTooShortOrAbsent,

    /// CRC8 over bytes 0..9 did not match byte 9
    #[error("CRC8 checksum mismatch")]
    ChecksumMismatch,

    /// Format code outside the known set
    #[error("unsupported message format {0}")]
    UnsupportedFormat(u8),
}

/// A validated 10-byte Omni message
///
/// Byte 0 packs the format (upper nibble) and device id (lower nibble),
/// bytes 1-8 are the payload interpreted per format, byte 9 is the CRC8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    bytes: [u8; FRAME_BYTES],
}

impl Frame {
    pub fn new(bytes: [u8; FRAME_BYTES]) -> Self {
        Self { bytes }
    }

    /// Get the 4-bit format discriminator
    pub fn format(&self) -> u8 {
        self.bytes[0] >> 4
    }

    /// Get the 4-bit device identifier
    pub fn device_id(&self) -> u8 {
        self.bytes[0] & 0x0F
    }

    /// The 8 payload bytes between the header byte and the checksum
    pub fn payload(&self) -> &[u8] {
        &self.bytes[1..FRAME_BYTES - 1]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Convert to hex string for diagnostics
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

/// Per-format layout knowledge
///
/// The dispatcher routes on an open table of these, so a new payload format
/// is one more entry; selection and checksum logic stay untouched.
pub struct FormatDescriptor {
    /// 4-bit format code this descriptor decodes
    pub code: u8,
    /// Model tag carried in output records
    pub model: &'static str,
    /// Ordered output schema, as the fields appear in emitted records
    pub fields: &'static [&'static str],
    /// Field extractor; only called on checksum-valid frames
    pub extract: fn(&Frame) -> FormatFields,
}

/// Decoded sensor record, one per successfully decoded message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorRecord {
    pub model: &'static str,
    pub fmt: u8,
    pub id: u8,
    #[serde(flatten)]
    pub fields: FormatFields,
    /// Integrity check indicator; always "CRC", only checksum-passing frames
    /// reach output
    pub mic: &'static str,
}

/// Format-specific measurement fields
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FormatFields {
    /// Format 0: microcontroller core temperature and supply voltage.
    /// The rest of the payload is reserved, so a hex dump rides along for
    /// protocol debugging.
    Core {
        #[serde(rename = "temperature_C")]
        temperature_c: f64,
        #[serde(rename = "voltage_V")]
        voltage_v: f64,
        payload: String,
    },

    /// Format 1: indoor/outdoor temperature and humidity, barometric
    /// pressure, supply voltage
    IndoorOutdoor {
        #[serde(rename = "temperature_C")]
        temperature_c: f64,
        #[serde(rename = "temperature_2_C")]
        temperature_2_c: f64,
        humidity: u8,
        humidity_2: u8,
        #[serde(rename = "pressure_hPa")]
        pressure_hpa: f64,
        #[serde(rename = "voltage_V")]
        voltage_v: f64,
    },
}
