//! Heart Rate Measurement characteristic (0x2A37) decoding.
//!
//! Wire layout:
//! ```text
//! Byte 0:   Flags
//!           Bit 0 = BPM field width (0: u8, 1: u16 little-endian)
//!           Bit 1 = sensor contact status
//!           Bit 2 = sensor contact supported
//!           Bit 3 = energy expended field present
//!           Bit 4 = RR-interval fields present
//! Byte 1:   BPM (u8 form), or
//! Byte 1-2: BPM (u16 little-endian form)
//! ```
//!
//! Only the flags bit that selects the BPM width is interpreted; the
//! optional trailing fields are ignored and must never be misread as
//! part of the BPM value.

use bitflags::bitflags;

use crate::error::DecodeError;

bitflags! {
    /// Flags byte of a heart-rate measurement notification.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Flags: u8 {
        const RATE_U16 = 1 << 0;
        const SENSOR_CONTACT_STATUS = 1 << 1;
        const SENSOR_CONTACT_SUPPORTED = 1 << 2;
        const ENERGY_EXPENDED = 1 << 3;
        const RR_INTERVAL = 1 << 4;
    }
}

/// One decoded heart-rate reading.
///
/// Produced per notification and handed straight to the observer;
/// nothing is retained between notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HeartRateSample {
    /// Beats per minute. The u8 wire form caps this at 255 today; the
    /// field is u16 so the reserved 16-bit form fits without a change.
    pub bpm: u16,
}

/// Decode a raw measurement notification payload.
///
/// The u16 BPM form is reported as [`DecodeError::Unimplemented16Bit`]
/// rather than decoded: no strap we have tested emits it, and a guessed
/// decode that is silently wrong would be worse than an explicit gap.
pub fn decode(payload: &[u8]) -> Result<HeartRateSample, DecodeError> {
    let flags = match payload.first() {
        Some(&b) => Flags::from_bits_retain(b),
        None => return Err(DecodeError::Empty),
    };

    if flags.contains(Flags::RATE_U16) {
        return Err(DecodeError::Unimplemented16Bit);
    }

    match payload.get(1) {
        Some(&bpm) => Ok(HeartRateSample { bpm: u16::from(bpm) }),
        None => Err(DecodeError::Truncated),
    }
}
