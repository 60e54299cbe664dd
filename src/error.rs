//! Error types for hrmlink.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! `defmt::Format` is derived behind the `defmt` feature for efficient
//! on-target logging.

/// Failure decoding a single heart-rate measurement notification.
///
/// Local to one notification: the link stays up and the next
/// notification is decoded independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Zero-length payload - no flags byte to inspect.
    Empty,

    /// Flags byte present but the value byte is missing.
    Truncated,

    /// Flags bit 0 set: BPM is a 16-bit little-endian field.
    ///
    /// Deliberately unimplemented - no monitor we have seen uses it.
    /// Kept as a distinct outcome so it can never be mistaken for a
    /// numeric reading.
    Unimplemented16Bit,
}

/// GATT-level error carried inside a radio event.
///
/// The radio adapter reports these; the link machine does not retry
/// them - recovery happens only through a disconnect event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GattError {
    /// Scan was cancelled or could not start.
    ScanFailed,
    /// Connection attempt failed.
    ConnectFailed,
    /// Service or characteristic discovery failed.
    DiscoveryFailed,
    /// Characteristic subscribe/notify failed.
    NotifyFailed,
}

/// A stall the link machine cannot clear on its own.
///
/// Reported to the observer; the machine holds its state until the
/// peripheral disconnects, which restarts the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkFault {
    /// Service discovery completed without the heart-rate service.
    ServiceNotFound,
    /// Characteristic discovery completed without the measurement
    /// characteristic.
    MeasurementCharNotFound,
    /// A discovery callback carried a GATT error.
    Gatt(GattError),
}

impl From<GattError> for LinkFault {
    fn from(e: GattError) -> Self {
        LinkFault::Gatt(e)
    }
}
