//! Hooks the driver calls on notable events.
//!
//! The driver itself never logs. Hand it an [`Observer`] to see what it does; use
//! [`LogObserver`] to route events through the `log` facade.

use crate::types::{DeviceIdentity, DeviceTelemetry, RemoteState, StatusFlags};

/// Receives driver events. Every method defaults to doing nothing.
pub trait Observer {
    /// All identity fields were read.
    fn identity_read(&mut self, _identity: &DeviceIdentity) {}

    /// A telemetry set was read.
    fn telemetry_read(&mut self, _telemetry: &DeviceTelemetry) {}

    /// Both status bytes were read.
    fn status_snapshot(&mut self, _status: &StatusFlags) {}

    /// A handshake step was written. `state` is where that step moves the device.
    fn remote_transition(&mut self, _state: RemoteState) {}

    /// The device set its command error bit after a commit.
    fn commit_rejected(&mut self) {}
}

impl<O: Observer + ?Sized> Observer for &mut O {
    fn identity_read(&mut self, identity: &DeviceIdentity) {
        (**self).identity_read(identity)
    }

    fn telemetry_read(&mut self, telemetry: &DeviceTelemetry) {
        (**self).telemetry_read(telemetry)
    }

    fn status_snapshot(&mut self, status: &StatusFlags) {
        (**self).status_snapshot(status)
    }

    fn remote_transition(&mut self, state: RemoteState) {
        (**self).remote_transition(state)
    }

    fn commit_rejected(&mut self) {
        (**self).commit_rejected()
    }
}

/// Ignores every event. The default observer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {}

/// Forwards events to the `log` facade under the `cotek` target.
///
/// Installing a logger is left to the application.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

const TARGET: &str = "cotek";

impl Observer for LogObserver {
    fn identity_read(&mut self, identity: &DeviceIdentity) {
        log::info!(target: TARGET, "identity: {identity}");
    }

    fn telemetry_read(&mut self, telemetry: &DeviceTelemetry) {
        log::info!(target: TARGET, "telemetry: {telemetry}");
    }

    fn status_snapshot(&mut self, status: &StatusFlags) {
        if status.any() {
            log::warn!(target: TARGET, "status: {status}");
        } else {
            log::debug!(target: TARGET, "status: {status}");
        }
    }

    fn remote_transition(&mut self, state: RemoteState) {
        let state: &'static str = state.into();
        log::debug!(target: TARGET, "handshake: {state}");
    }

    fn commit_rejected(&mut self) {
        log::warn!(target: TARGET, "commit rejected by the device");
    }
}
