//! Bluetooth Low Energy vocabulary and the event/request interface.
//!
//! The crate plays the **Central** role against a single heart-rate
//! peripheral. The radio adapter (SoftDevice, BlueZ, CoreBluetooth,
//! a test harness - anything that can scan and run a GATT client) sits
//! on the other side of two enums:
//!
//! 1. [`RadioEvent`] - asynchronous callbacks the adapter delivers
//!    (adapter power state, advertisements, connects, disconnects,
//!    discovery results, notification values).
//! 2. [`RadioRequest`] - fire-and-forget operations the link machine
//!    asks the adapter to perform. Completion is only ever observed
//!    through a later event.
//!
//! Observers (a display, a health-data store) receive [`MonitorEvent`]s
//! on a separate channel so slow consumers never stall the radio.

pub mod adv_parser;
pub mod driver;
pub mod link;

use heapless::{String, Vec};

use crate::config::{
    MAX_ADV_DATA_LEN, MAX_CHARACTERISTICS, MAX_DEVICE_NAME_LEN, MAX_NOTIFICATION_LEN, MAX_SERVICES,
};
use crate::error::{GattError, LinkFault};
use crate::measurement::HeartRateSample;

pub use link::{LinkMachine, LinkState, Outcome};

/// Power/authorization state of the local BLE adapter.
///
/// Reported by the radio adapter; the link machine only observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdapterState {
    Unknown,
    Resetting,
    Unsupported,
    Unauthorized,
    PoweredOff,
    PoweredOn,
}

/// A service or characteristic identifier.
///
/// SIG-assigned numbers travel in short form; vendor identifiers use
/// the full 128 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Uuid {
    /// 16-bit assigned number (e.g. 0x2A37).
    Short(u16),
    /// Full 128-bit UUID, as written in its canonical form.
    Long(u128),
}

/// Opaque token for a remote peripheral, minted by the radio adapter.
///
/// The link machine holds at most one active handle. A handle is
/// discarded on disconnect and never operated on again; the adapter
/// mints a fresh one for the next discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeripheralHandle(pub u16);

/// A discovered GATT service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GattService {
    pub uuid: Uuid,
    /// ATT handle range containing the service's characteristics.
    pub start_handle: u16,
    pub end_handle: u16,
}

/// A discovered GATT characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GattCharacteristic {
    pub uuid: Uuid,
    /// ATT handle of the characteristic value attribute.
    pub value_handle: u16,
}

/// Raw advertisement payload (legacy PDU, at most 31 octets).
pub type AdvData = Vec<u8, MAX_ADV_DATA_LEN>;

/// Notification payload as delivered by the adapter.
pub type NotificationPayload = Vec<u8, MAX_NOTIFICATION_LEN>;

/// Device name extracted from advertisement data.
pub type DeviceName = String<MAX_DEVICE_NAME_LEN>;

/// Asynchronous callbacks delivered by the radio adapter.
///
/// Events for one peripheral arrive serialized and must be fed to the
/// link machine in delivery order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioEvent {
    /// The local adapter changed power/authorization state.
    AdapterStateChanged(AdapterState),

    /// An advertisement was received while scanning.
    PeripheralDiscovered {
        handle: PeripheralHandle,
        adv_data: AdvData,
        rssi: i8,
    },

    /// A connection attempt succeeded.
    Connected(PeripheralHandle),

    /// The connection dropped, or a connect attempt failed terminally.
    Disconnected {
        handle: PeripheralHandle,
        error: Option<GattError>,
    },

    /// Service discovery completed.
    ServicesDiscovered {
        handle: PeripheralHandle,
        services: Vec<GattService, MAX_SERVICES>,
        error: Option<GattError>,
    },

    /// Characteristic discovery completed for one service.
    CharacteristicsDiscovered {
        handle: PeripheralHandle,
        service: GattService,
        characteristics: Vec<GattCharacteristic, MAX_CHARACTERISTICS>,
        error: Option<GattError>,
    },

    /// A subscribed characteristic pushed a new value.
    ValueUpdated {
        handle: PeripheralHandle,
        characteristic: GattCharacteristic,
        payload: NotificationPayload,
        error: Option<GattError>,
    },
}

/// Fire-and-forget operations the link machine issues to the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioRequest {
    /// Scan for peripherals advertising the given service.
    StartScan { service: Uuid },

    /// Stop an in-progress scan (saves battery once a target is found).
    StopScan,

    /// Connect to a discovered peripheral.
    Connect(PeripheralHandle),

    /// Discover services, filtered to the given service UUID.
    DiscoverServices {
        peripheral: PeripheralHandle,
        service: Uuid,
    },

    /// Discover characteristics within a service.
    ///
    /// `filter` is `None` today: the original flow discovers the whole
    /// service and picks the measurement characteristic from the result.
    DiscoverCharacteristics {
        peripheral: PeripheralHandle,
        service: GattService,
        filter: Option<Uuid>,
    },

    /// Enable or disable notifications on a characteristic.
    SetNotify {
        peripheral: PeripheralHandle,
        characteristic: GattCharacteristic,
        enabled: bool,
    },
}

/// Events published for the presentation boundary (display, store).
///
/// Delivered with `try_send`: a slow observer drops events rather than
/// blocking the radio context.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MonitorEvent {
    /// Adapter power state, forwarded for display.
    AdapterChanged(AdapterState),

    /// The link machine moved to a new state ("searching" vs
    /// "connected" indicators derive from this).
    LinkChanged(LinkState),

    /// Connected to the named peripheral.
    Connected(DeviceName),

    /// A decoded heart-rate reading.
    HeartRate(HeartRateSample),

    /// The link stalled; only a disconnect will clear it.
    Fault(LinkFault),
}
