//! Radio event pump.
//!
//! Owns the [`LinkMachine`] and the ordering guarantee: radio events
//! are taken from the inbound channel one at a time, in delivery
//! order, and the requests they produce are forwarded before the next
//! event is examined. The radio adapter task sits on the far side of
//! both channels - it pushes callbacks in and executes requests out,
//! so the machine never blocks inside a radio callback.
//!
//! Monitor updates are handed to the presentation boundary with
//! `try_send`: a stalled display drops updates rather than stalling
//! the radio.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use log::warn;

use crate::ble::{LinkMachine, MonitorEvent, RadioEvent, RadioRequest};
use crate::config::{EVENT_QUEUE_DEPTH, MONITOR_QUEUE_DEPTH, REQUEST_QUEUE_DEPTH};

/// Inbound queue the radio adapter delivers events into.
pub type EventChannel = Channel<CriticalSectionRawMutex, RadioEvent, EVENT_QUEUE_DEPTH>;

/// Outbound queue the radio adapter executes requests from.
pub type RequestChannel = Channel<CriticalSectionRawMutex, RadioRequest, REQUEST_QUEUE_DEPTH>;

/// Queue feeding the presentation boundary (display, store).
pub type MonitorChannel = Channel<CriticalSectionRawMutex, MonitorEvent, MONITOR_QUEUE_DEPTH>;

/// Run the pump until the surrounding executor drops it.
pub async fn run(
    mut link: LinkMachine,
    events: Receiver<'_, CriticalSectionRawMutex, RadioEvent, EVENT_QUEUE_DEPTH>,
    requests: Sender<'_, CriticalSectionRawMutex, RadioRequest, REQUEST_QUEUE_DEPTH>,
    monitor: Sender<'_, CriticalSectionRawMutex, MonitorEvent, MONITOR_QUEUE_DEPTH>,
) {
    loop {
        let event = events.receive().await;
        let outcome = link.handle(event);

        for request in outcome.requests {
            requests.send(request).await;
        }
        for update in outcome.monitor {
            // try_send avoids blocking; if the observer is behind, we drop.
            if monitor.try_send(update).is_err() {
                warn!("monitor channel full - dropping update");
            }
        }
    }
}
