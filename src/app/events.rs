//! Outbound application events.
//!
//! The [`ControllerService`](super::service::ControllerService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.

use crate::error::SensorError;
use crate::fsm::{ControlMode, Strategy};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),

    /// The outer control mode changed.
    ModeChanged { from: ControlMode, to: ControlMode },

    /// The thermocouple stopped producing readings.
    SensorFault(SensorError),

    /// Readings are back after a fault.
    SensorRecovered,

    /// No valid frame within the link timeout.
    LinkLost,

    LinkRestored,

    /// The service has started (carries the initial mode).
    Started(ControlMode),
}

/// A point-in-time telemetry snapshot suitable for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryData {
    pub mode: ControlMode,
    pub inner: Strategy,
    pub setpoint: f32,
    pub pv: f32,
    pub cv: f32,
    pub link_ok: bool,
    pub faults: u32,
    pub frames_received: u32,
    pub resync_drops: u32,
}
