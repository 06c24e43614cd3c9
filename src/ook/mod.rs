//! OOK/PWM front end: pulse timings to repeated bit rows
//!
//! This module provides the rtl_433-style demodulation stages:
//! 1. Read pulse/gap durations from the pulse source
//! 2. Classify pulse widths into data bits and sync marks
//! 3. Collect bits into rows, one row per transmission repeat
//!
//! The Omni sensor sends 4 identical repeats per transmission; downstream
//! decoding picks one repeated row and validates it.

mod bitbuffer;
mod capture;
mod slicer;

pub use bitbuffer::BitBuffer;
pub use capture::{CaptureStats, PulseCapture};
pub use slicer::{Pulse, PwmSlicer};

/// Short pulse width (a 1 bit), microseconds
pub const SHORT_PULSE_US: u32 = 200;

/// Long pulse width (a 0 bit), microseconds
pub const LONG_PULSE_US: u32 = 400;

/// Sync/preamble pulse width, microseconds
pub const SYNC_PULSE_US: u32 = 600;

/// Gaps at least this long end the current row
pub const GAP_LIMIT_US: u32 = 500;

/// Gaps at least this long end the whole transmission
pub const RESET_LIMIT_US: u32 = 1250;
