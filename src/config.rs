//! Compile-time configuration and protocol constants.
//!
//! All GATT identifiers, queue depths, and buffer capacities live here
//! so they can be tuned in one place.

use crate::ble::Uuid;

// GATT identifiers

/// Service UUID the scan is filtered by.
///
/// This monitor advertises its heart-rate service under a vendor UUID
/// rather than the Bluetooth SIG assigned number (0x180D).
pub const HEART_RATE_SERVICE: Uuid = Uuid::Long(0x61353090_8231_49cc_b57a_886370740041);

/// Heart Rate Measurement characteristic (notifying; the one we consume).
pub const HEART_RATE_MEASUREMENT: Uuid = Uuid::Short(0x2A37);

/// Body Sensor Location characteristic.
///
/// Discovered alongside the measurement characteristic but not read
/// today - reserved for a future "sensor worn on wrist/chest" display.
pub const BODY_SENSOR_LOCATION: Uuid = Uuid::Short(0x2A38);

// Channel depths

/// Inbound radio-event queue depth.
pub const EVENT_QUEUE_DEPTH: usize = 8;

/// Outbound radio-request queue depth.
pub const REQUEST_QUEUE_DEPTH: usize = 8;

/// Presentation (monitor) queue depth.
pub const MONITOR_QUEUE_DEPTH: usize = 16;

// Buffer capacities

/// Maximum legacy advertisement payload (31 octets per the Core spec).
pub const MAX_ADV_DATA_LEN: usize = 31;

/// Device names are truncated to this many bytes.
pub const MAX_DEVICE_NAME_LEN: usize = 32;

/// Maximum notification payload we retain (default ATT_MTU minus header).
pub const MAX_NOTIFICATION_LEN: usize = 20;

/// Maximum services carried in one discovery event.
pub const MAX_SERVICES: usize = 4;

/// Maximum characteristics carried in one discovery event.
pub const MAX_CHARACTERISTICS: usize = 8;
