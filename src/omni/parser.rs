//! Omni message parser
//!
//! Takes the repeated bit rows of one transmission and produces a typed
//! sensor record: pick a sufficiently repeated row, verify the CRC8, then
//! route on the format code to the matching field extractor.

use tracing::debug;

use super::bitfield::{extract_signed, extract_unsigned};
use super::crc::check_crc;
use super::types::{
    DecodeError, FormatDescriptor, FormatFields, Frame, SensorRecord, FRAME_BITS, FRAME_BITS_MAX,
    FRAME_BYTES, MIN_REPEATS,
};
use crate::ook::BitBuffer;

/// First temperature field: byte 1 plus the upper nibble of byte 2
const TEMP_1_START_BIT: usize = 8;
/// Second temperature field: lower nibble of byte 2 plus byte 3
const TEMP_2_START_BIT: usize = 20;
/// Temperatures are 12-bit two's-complement, tenths of a degree C
const TEMP_FIELD_BITS: usize = 12;
/// Barometric pressure: bytes 6-7, big-endian, tenths of hPa
const PRESSURE_START_BIT: usize = 48;
const PRESSURE_FIELD_BITS: usize = 16;

/// Known message formats; codes 2-15 are reserved by the protocol
static FORMATS: &[FormatDescriptor] = &[
    FormatDescriptor {
        code: 0,
        model: "Omni_00",
        fields: &[
            "model",
            "fmt",
            "id",
            "temperature_C",
            "voltage_V",
            "payload",
            "mic",
        ],
        extract: extract_core_status,
    },
    FormatDescriptor {
        code: 1,
        model: "Omni_01",
        fields: &[
            "model",
            "fmt",
            "id",
            "temperature_C",
            "temperature_2_C",
            "humidity",
            "humidity_2",
            "pressure_hPa",
            "voltage_V",
            "mic",
        ],
        extract: extract_indoor_outdoor,
    },
];

/// Look up the descriptor for a format code
pub fn format_descriptor(code: u8) -> Option<&'static FormatDescriptor> {
    FORMATS.iter().find(|d| d.code == code)
}

/// Decode one transmission
///
/// The buffer holds the bit rows of the (nominally 4) repeats produced by the
/// demodulator. Decoding is pure: nothing is retained across calls.
pub fn decode(bits: &BitBuffer) -> Result<SensorRecord, DecodeError> {
    let frame = select_frame(bits)?;
    decode_frame(&frame)
}

/// Validate and extract an already-selected 10-byte frame
pub fn decode_frame(frame: &Frame) -> Result<SensorRecord, DecodeError> {
    if check_crc(frame.as_bytes()).is_err() {
        debug!("CRC8 checksum error: {}", frame.to_hex());
        return Err(DecodeError::ChecksumMismatch);
    }

    let fmt = frame.format();
    let descriptor = format_descriptor(fmt).ok_or_else(|| {
        debug!("unknown message format {}: {}", fmt, frame.to_hex());
        DecodeError::UnsupportedFormat(fmt)
    })?;

    Ok(SensorRecord {
        model: descriptor.model,
        fmt,
        id: frame.device_id(),
        fields: (descriptor.extract)(frame),
        mic: "CRC",
    })
}

/// Pick one canonical row out of the repeated transmissions
///
/// Accepts the first row repeated at least twice at 80 bits, tolerating up to
/// 2 trailing jitter bits; anything else is noise or partial reception.
fn select_frame(bits: &BitBuffer) -> Result<Frame, DecodeError> {
    let row_idx = bits
        .find_repeated_row(MIN_REPEATS, FRAME_BITS)
        .ok_or(DecodeError::FrameTooShortOrAbsent)?;

    let row = bits.row(row_idx);
    if row.num_bits() > FRAME_BITS_MAX {
        return Err(DecodeError::FrameTooShortOrAbsent);
    }

    let mut bytes = [0u8; FRAME_BYTES];
    bytes.copy_from_slice(&row.bytes()[..FRAME_BYTES]);
    Ok(Frame::new(bytes))
}

/// Decode a 12-bit two's-complement temperature field, 0.1 degC resolution
fn decode_temperature(frame: &Frame, start_bit: usize) -> f64 {
    extract_signed(frame.as_bytes(), start_bit, TEMP_FIELD_BITS) as f64 / 10.0
}

/// Decode the supply voltage byte: (VCC - 3.00) * 100, range 3.00..5.55 V
fn decode_supply_voltage(frame: &Frame) -> f64 {
    frame.as_bytes()[8] as f64 / 100.0 + 3.00
}

/// Format 0: core temperature + supply voltage
fn extract_core_status(frame: &Frame) -> FormatFields {
    let payload = frame
        .payload()
        .iter()
        .map(|b| format!("0x{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ");

    FormatFields::Core {
        temperature_c: decode_temperature(frame, TEMP_1_START_BIT),
        voltage_v: decode_supply_voltage(frame),
        payload,
    }
}

/// Format 1: dual temperature/humidity, pressure, supply voltage
fn extract_indoor_outdoor(frame: &Frame) -> FormatFields {
    let b = frame.as_bytes();

    FormatFields::IndoorOutdoor {
        temperature_c: decode_temperature(frame, TEMP_1_START_BIT),
        temperature_2_c: decode_temperature(frame, TEMP_2_START_BIT),
        humidity: b[4],
        humidity_2: b[5],
        pressure_hpa: extract_unsigned(b, PRESSURE_START_BIT, PRESSURE_FIELD_BITS) as f64 / 10.0,
        voltage_v: decode_supply_voltage(frame),
    }
}
