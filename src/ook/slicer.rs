//! PWM pulse slicing
//!
//! The Omni sensor is On-Off-Keyed with pulse-width modulation: a short
//! 200 us pulse followed by a long gap is a 1 bit, a long 400 us pulse
//! followed by a short gap is a 0 bit, and 600 us pulses are the sync
//! preamble. The slicer turns a stream of pulse timings into bit rows,
//! one row per transmission repeat.

use super::bitbuffer::BitBuffer;
use super::{GAP_LIMIT_US, LONG_PULSE_US, RESET_LIMIT_US, SHORT_PULSE_US, SYNC_PULSE_US};

/// Midpoint between short and long pulses: below is a 1 bit, above a 0 bit
const BIT_THRESHOLD_US: u32 = (SHORT_PULSE_US + LONG_PULSE_US) / 2;

/// Midpoint between long and sync pulses: above is a sync mark
const SYNC_THRESHOLD_US: u32 = (LONG_PULSE_US + SYNC_PULSE_US) / 2;

/// One demodulated OOK pulse: mark then space duration, microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    pub pulse_us: u32,
    pub gap_us: u32,
}

/// Slicer statistics
#[derive(Debug, Default)]
pub struct SlicerStats {
    pub pulses: u64,
    pub sync_pulses: u64,
    pub transmissions: u64,
}

/// PWM slicer - classifies pulses and assembles bit rows
#[derive(Debug, Default)]
pub struct PwmSlicer {
    bits: BitBuffer,
    pub stats: SlicerStats,
}

impl PwmSlicer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one pulse
    ///
    /// Returns the accumulated transmission when the reset gap is seen.
    pub fn process(&mut self, pulse: Pulse) -> Option<BitBuffer> {
        self.stats.pulses += 1;

        if pulse.pulse_us < BIT_THRESHOLD_US {
            self.bits.add_bit(true);
        } else if pulse.pulse_us < SYNC_THRESHOLD_US {
            self.bits.add_bit(false);
        } else {
            // sync pulse marks a row boundary between repeats
            self.stats.sync_pulses += 1;
            self.bits.new_row();
        }

        if pulse.gap_us >= RESET_LIMIT_US {
            return self.flush();
        }
        if pulse.gap_us >= GAP_LIMIT_US {
            self.bits.new_row();
        }
        None
    }

    /// Finish the in-progress transmission, if any bits were collected
    ///
    /// Called on reset gaps and once more when the pulse source ends.
    pub fn flush(&mut self) -> Option<BitBuffer> {
        let bits = std::mem::take(&mut self.bits);
        if bits.is_empty() {
            None
        } else {
            self.stats.transmissions += 1;
            Some(bits)
        }
    }
}
