//! Connection state machine for the single heart-rate peripheral.
//!
//! ```text
//! Idle -> Scanning -> Connecting -> DiscoveringServices
//!      -> DiscoveringCharacteristics -> Subscribing -> Monitoring
//! ```
//!
//! Every transition is driven by one [`RadioEvent`]; the action it
//! takes is a list of fire-and-forget [`RadioRequest`]s whose
//! completion is only observed through a later event. A disconnect
//! from any non-`Idle` state discards the peripheral handle and
//! unconditionally restarts the scan - reconnection is automatic and
//! unthrottled, there is no "give up" state.
//!
//! Radio stacks redeliver and interleave callbacks, so every handler
//! is idempotent: an event whose transition has already been taken,
//! or one referencing a peripheral that is no longer active, is
//! ignored.

use heapless::Vec;
use log::{debug, info, warn};

use crate::ble::adv_parser;
use crate::ble::{
    AdapterState, GattCharacteristic, GattService, MonitorEvent, PeripheralHandle, RadioEvent,
    RadioRequest,
};
use crate::config::{BODY_SENSOR_LOCATION, HEART_RATE_MEASUREMENT, HEART_RATE_SERVICE};
use crate::error::{GattError, LinkFault};
use crate::measurement;

/// The explicit state of the link machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// Waiting for the adapter to report `PoweredOn`.
    Idle,
    /// Scanning for a peripheral advertising the heart-rate service.
    Scanning,
    /// Connect request issued, waiting for the connect event.
    Connecting,
    /// Connected; waiting for service discovery results.
    DiscoveringServices,
    /// Heart-rate service found; waiting for its characteristics.
    DiscoveringCharacteristics,
    /// Notify enable issued; waiting for the first notification.
    Subscribing,
    /// Subscribed; decoding measurement notifications as they arrive.
    Monitoring,
}

impl LinkState {
    /// Short lowercase name for log lines.
    pub const fn name(self) -> &'static str {
        match self {
            LinkState::Idle => "idle",
            LinkState::Scanning => "scanning",
            LinkState::Connecting => "connecting",
            LinkState::DiscoveringServices => "discovering-services",
            LinkState::DiscoveringCharacteristics => "discovering-characteristics",
            LinkState::Subscribing => "subscribing",
            LinkState::Monitoring => "monitoring",
        }
    }
}

/// Everything one event produced: requests back to the radio adapter
/// and updates for the presentation boundary.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Outcome {
    pub requests: Vec<RadioRequest, 2>,
    pub monitor: Vec<MonitorEvent, 2>,
}

impl Outcome {
    fn request(&mut self, request: RadioRequest) {
        if self.requests.push(request).is_err() {
            warn!("outcome request list full - request dropped");
        }
    }

    fn notify(&mut self, update: MonitorEvent) {
        if self.monitor.push(update).is_err() {
            warn!("outcome monitor list full - update dropped");
        }
    }
}

/// The connection state machine.
///
/// Pure apart from logging: `handle` mutates only the machine's own
/// state and returns the requests/updates for the caller to deliver.
/// The driver task feeds it one event at a time, in delivery order.
pub struct LinkMachine {
    state: LinkState,
    /// The one peripheral we operate on, if any. Cleared on disconnect
    /// and never reused.
    active: Option<PeripheralHandle>,
    /// Advertised name of the active peripheral, for the display.
    peer_name: Option<crate::ble::DeviceName>,
    /// The measurement characteristic, once discovered.
    measurement_char: Option<GattCharacteristic>,
}

impl LinkMachine {
    pub const fn new() -> Self {
        Self {
            state: LinkState::Idle,
            active: None,
            peer_name: None,
            measurement_char: None,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn active_peripheral(&self) -> Option<PeripheralHandle> {
        self.active
    }

    /// Process one radio event and return what it produced.
    pub fn handle(&mut self, event: RadioEvent) -> Outcome {
        match event {
            RadioEvent::AdapterStateChanged(state) => self.on_adapter_state(state),
            RadioEvent::PeripheralDiscovered {
                handle,
                adv_data,
                rssi,
            } => self.on_discovered(handle, &adv_data, rssi),
            RadioEvent::Connected(handle) => self.on_connected(handle),
            RadioEvent::Disconnected { handle, error } => self.on_disconnected(handle, error),
            RadioEvent::ServicesDiscovered {
                handle,
                services,
                error,
            } => self.on_services(handle, &services, error),
            RadioEvent::CharacteristicsDiscovered {
                handle,
                service,
                characteristics,
                error,
            } => self.on_characteristics(handle, service, &characteristics, error),
            RadioEvent::ValueUpdated {
                handle,
                characteristic,
                payload,
                error,
            } => self.on_value(handle, characteristic, &payload, error),
        }
    }

    fn on_adapter_state(&mut self, adapter: AdapterState) -> Outcome {
        let mut out = Outcome::default();
        out.notify(MonitorEvent::AdapterChanged(adapter));

        match (self.state, adapter) {
            (LinkState::Idle, AdapterState::PoweredOn) => {
                info!("adapter powered on - scanning for heart-rate service");
                out.request(RadioRequest::StartScan {
                    service: HEART_RATE_SERVICE,
                });
                self.transition(LinkState::Scanning, &mut out);
            }
            (LinkState::Idle, unavailable) => {
                warn!("adapter unavailable: {:?}", unavailable);
            }
            (_, reported) => {
                // Teardown is only ever observed through a disconnect
                // event; adapter chatter mid-link is report-only.
                debug!(
                    "adapter state {:?} while {} - no action",
                    reported,
                    self.state.name()
                );
            }
        }
        out
    }

    fn on_discovered(&mut self, handle: PeripheralHandle, adv_data: &[u8], rssi: i8) -> Outcome {
        let mut out = Outcome::default();
        if self.state != LinkState::Scanning {
            debug!("advertisement ignored while {}", self.state.name());
            return out;
        }
        // The scan is already filtered, but a radio stack may hand us
        // more than we asked for; verify the advertisement ourselves.
        if !adv_parser::advertises_service(adv_data, HEART_RATE_SERVICE) {
            debug!("peripheral {:?} does not advertise heart rate", handle);
            return out;
        }

        let name = adv_parser::extract_device_name(adv_data);
        info!("found {} (RSSI {} dBm)", name.as_str(), rssi);

        self.active = Some(handle);
        self.peer_name = Some(name);
        out.request(RadioRequest::StopScan);
        out.request(RadioRequest::Connect(handle));
        self.transition(LinkState::Connecting, &mut out);
        out
    }

    fn on_connected(&mut self, handle: PeripheralHandle) -> Outcome {
        let mut out = Outcome::default();
        if !self.is_active(handle) {
            warn!("connect event for stale peripheral {:?} ignored", handle);
            return out;
        }
        if self.state != LinkState::Connecting {
            debug!("connect event redelivered while {}", self.state.name());
            return out;
        }

        out.notify(MonitorEvent::Connected(
            self.peer_name.clone().unwrap_or_default(),
        ));
        out.request(RadioRequest::DiscoverServices {
            peripheral: handle,
            service: HEART_RATE_SERVICE,
        });
        self.transition(LinkState::DiscoveringServices, &mut out);
        out
    }

    fn on_services(
        &mut self,
        handle: PeripheralHandle,
        services: &[GattService],
        error: Option<GattError>,
    ) -> Outcome {
        let mut out = Outcome::default();
        if !self.is_active(handle) {
            warn!("service discovery for stale peripheral {:?} ignored", handle);
            return out;
        }
        if self.state != LinkState::DiscoveringServices {
            debug!("service discovery redelivered while {}", self.state.name());
            return out;
        }
        if let Some(e) = error {
            warn!("service discovery failed: {:?}", e);
            out.notify(MonitorEvent::Fault(e.into()));
            return out;
        }

        match services.iter().find(|s| s.uuid == HEART_RATE_SERVICE) {
            Some(&service) => {
                out.request(RadioRequest::DiscoverCharacteristics {
                    peripheral: handle,
                    service,
                    filter: None,
                });
                self.transition(LinkState::DiscoveringCharacteristics, &mut out);
            }
            None => {
                // No recovery transition exists for this; the stall
                // clears when the peripheral disconnects.
                warn!("peripheral exposes no heart-rate service");
                out.notify(MonitorEvent::Fault(LinkFault::ServiceNotFound));
            }
        }
        out
    }

    fn on_characteristics(
        &mut self,
        handle: PeripheralHandle,
        service: GattService,
        characteristics: &[GattCharacteristic],
        error: Option<GattError>,
    ) -> Outcome {
        let mut out = Outcome::default();
        if !self.is_active(handle) {
            warn!(
                "characteristic discovery for stale peripheral {:?} ignored",
                handle
            );
            return out;
        }
        if self.state != LinkState::DiscoveringCharacteristics {
            debug!(
                "characteristic discovery redelivered while {}",
                self.state.name()
            );
            return out;
        }
        if service.uuid != HEART_RATE_SERVICE {
            debug!("characteristics for undiscovered service ignored");
            return out;
        }
        if let Some(e) = error {
            warn!("characteristic discovery failed: {:?}", e);
            out.notify(MonitorEvent::Fault(e.into()));
            return out;
        }

        if characteristics
            .iter()
            .any(|c| c.uuid == BODY_SENSOR_LOCATION)
        {
            debug!("body sensor location characteristic present (unused)");
        }

        match characteristics
            .iter()
            .find(|c| c.uuid == HEART_RATE_MEASUREMENT)
        {
            Some(&characteristic) => {
                self.measurement_char = Some(characteristic);
                out.request(RadioRequest::SetNotify {
                    peripheral: handle,
                    characteristic,
                    enabled: true,
                });
                self.transition(LinkState::Subscribing, &mut out);
            }
            None => {
                warn!("heart-rate service has no measurement characteristic");
                out.notify(MonitorEvent::Fault(LinkFault::MeasurementCharNotFound));
            }
        }
        out
    }

    fn on_value(
        &mut self,
        handle: PeripheralHandle,
        characteristic: GattCharacteristic,
        payload: &[u8],
        error: Option<GattError>,
    ) -> Outcome {
        let mut out = Outcome::default();
        if !self.is_active(handle) {
            warn!("value update for stale peripheral {:?} ignored", handle);
            return out;
        }
        if !matches!(self.state, LinkState::Subscribing | LinkState::Monitoring) {
            debug!("value update ignored while {}", self.state.name());
            return out;
        }
        if self.measurement_char != Some(characteristic) {
            debug!("notification for unsubscribed characteristic ignored");
            return out;
        }

        // The first notification is the subscription acknowledgement.
        if self.state == LinkState::Subscribing {
            self.transition(LinkState::Monitoring, &mut out);
        }

        if let Some(e) = error {
            warn!("value update carried an error: {:?}", e);
            return out;
        }

        match measurement::decode(payload) {
            Ok(sample) => {
                debug!("{} bpm", sample.bpm);
                out.notify(MonitorEvent::HeartRate(sample));
            }
            Err(e) => {
                // Local to this notification; the reading is withheld
                // and the link stays up for the next one.
                warn!("measurement decode failed: {:?}", e);
            }
        }
        out
    }

    fn on_disconnected(
        &mut self,
        handle: PeripheralHandle,
        error: Option<GattError>,
    ) -> Outcome {
        let mut out = Outcome::default();
        if self.state == LinkState::Idle {
            debug!("disconnect while idle ignored");
            return out;
        }
        if !self.is_active(handle) {
            warn!("disconnect for stale peripheral {:?} ignored", handle);
            return out;
        }

        match error {
            Some(e) => warn!("link lost ({:?}) - rescanning", e),
            None => info!("peripheral disconnected - rescanning"),
        }

        // The handle is dead from here on; the next discovery mints a
        // fresh one.
        self.active = None;
        self.peer_name = None;
        self.measurement_char = None;

        out.request(RadioRequest::StartScan {
            service: HEART_RATE_SERVICE,
        });
        self.transition(LinkState::Scanning, &mut out);
        out
    }

    fn is_active(&self, handle: PeripheralHandle) -> bool {
        self.active == Some(handle)
    }

    fn transition(&mut self, next: LinkState, out: &mut Outcome) {
        if self.state != next {
            info!("link: {} -> {}", self.state.name(), next.name());
            self.state = next;
            out.notify(MonitorEvent::LinkChanged(next));
        }
    }
}

impl Default for LinkMachine {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod proptests {
    use super::tests::{characteristics_event, hr_adv, measurement_char, services_event};
    use super::*;
    use proptest::prelude::*;

    fn arb_handle() -> impl Strategy<Value = PeripheralHandle> {
        (0u16..4).prop_map(PeripheralHandle)
    }

    fn arb_event() -> impl Strategy<Value = RadioEvent> {
        let adapter = prop_oneof![
            Just(AdapterState::Unknown),
            Just(AdapterState::Resetting),
            Just(AdapterState::Unsupported),
            Just(AdapterState::Unauthorized),
            Just(AdapterState::PoweredOff),
            Just(AdapterState::PoweredOn),
        ]
        .prop_map(RadioEvent::AdapterStateChanged);

        let discovered = arb_handle().prop_map(|handle| RadioEvent::PeripheralDiscovered {
            handle,
            adv_data: hr_adv(),
            rssi: -60,
        });
        let connected = arb_handle().prop_map(RadioEvent::Connected);
        let disconnected = (arb_handle(), any::<bool>()).prop_map(|(handle, failed)| {
            RadioEvent::Disconnected {
                handle,
                error: failed.then_some(GattError::ConnectFailed),
            }
        });
        let services = (arb_handle(), any::<bool>()).prop_map(|(handle, found)| {
            let event = services_event(handle);
            if found {
                event
            } else {
                RadioEvent::ServicesDiscovered {
                    handle,
                    services: heapless::Vec::new(),
                    error: None,
                }
            }
        });
        let characteristics = arb_handle().prop_map(characteristics_event);
        let value = (arb_handle(), proptest::collection::vec(any::<u8>(), 0..4)).prop_map(
            |(handle, bytes)| RadioEvent::ValueUpdated {
                handle,
                characteristic: measurement_char(),
                payload: heapless::Vec::from_slice(&bytes).unwrap(),
                error: None,
            },
        );

        prop_oneof![
            adapter,
            discovered,
            connected,
            disconnected,
            services,
            characteristics,
            value
        ]
    }

    proptest! {
        #[test]
        fn handle_tracks_connection_states(
            events in proptest::collection::vec(arb_event(), 1..200)
        ) {
            let mut link = LinkMachine::new();
            for event in events {
                let _ = link.handle(event);
                match link.state() {
                    LinkState::Idle | LinkState::Scanning => {
                        prop_assert!(link.active_peripheral().is_none());
                    }
                    _ => prop_assert!(link.active_peripheral().is_some()),
                }
            }
        }

        #[test]
        fn requests_only_reference_the_active_peripheral(
            events in proptest::collection::vec(arb_event(), 1..200)
        ) {
            let mut link = LinkMachine::new();
            for event in events {
                let out = link.handle(event);
                for request in &out.requests {
                    let target = match *request {
                        RadioRequest::Connect(p)
                        | RadioRequest::DiscoverServices { peripheral: p, .. }
                        | RadioRequest::DiscoverCharacteristics { peripheral: p, .. }
                        | RadioRequest::SetNotify { peripheral: p, .. } => Some(p),
                        RadioRequest::StartScan { .. } | RadioRequest::StopScan => None,
                    };
                    if let Some(p) = target {
                        prop_assert_eq!(Some(p), link.active_peripheral());
                    }
                }
            }
        }

        #[test]
        fn matching_disconnect_always_rescans(
            events in proptest::collection::vec(arb_event(), 1..100)
        ) {
            let mut link = LinkMachine::new();
            for event in events {
                let _ = link.handle(event);
            }
            if let Some(active) = link.active_peripheral() {
                let out = link.handle(RadioEvent::Disconnected {
                    handle: active,
                    error: None,
                });
                prop_assert_eq!(link.state(), LinkState::Scanning);
                prop_assert_eq!(
                    out.requests.as_slice(),
                    &[RadioRequest::StartScan {
                        service: HEART_RATE_SERVICE
                    }]
                );
            }
        }
    }
}
