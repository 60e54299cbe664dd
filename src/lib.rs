//! BLE central client for heart-rate monitors.
//!
//! Discovers a single peripheral advertising the heart-rate service,
//! connects, walks GATT discovery, subscribes to the Heart Rate
//! Measurement characteristic, and decodes its notifications into
//! beats-per-minute samples.
//!
//! The crate is sans-IO: the platform radio stack is an external
//! collaborator that delivers [`RadioEvent`]s and executes
//! [`RadioRequest`]s. The [`LinkMachine`] turns one event at a time
//! into requests plus [`MonitorEvent`] updates for a display or data
//! store, and [`ble::driver::run`] pumps the three channels on an
//! async executor. Everything is testable on the host without a radio.

#![cfg_attr(not(test), no_std)]

pub mod ble;
pub mod config;
pub mod error;
pub mod measurement;

pub use ble::{
    AdapterState, GattCharacteristic, GattService, LinkMachine, LinkState, MonitorEvent,
    PeripheralHandle, RadioEvent, RadioRequest, Uuid,
};
pub use error::{DecodeError, GattError, LinkFault};
pub use measurement::{decode, HeartRateSample};
