//! Port traits: the boundary between the control core and the hardware.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControllerService (domain)
//! ```
//!
//! Driven adapters (thermocouple, heater output, event sinks) implement
//! these traits. The [`ControllerService`](super::service::ControllerService)
//! consumes them via generics, so the control core never touches hardware
//! directly. The byte link has its own trait,
//! [`Transport`](crate::rpc::transport::Transport).

use crate::error::SensorError;

// ───────────────────────────────────────────────────────────────
// Temperature port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Process-value source for one control loop.
pub trait TemperaturePort {
    /// Latest temperature, or why there is no reading.
    fn read_temperature(&mut self) -> Result<f32, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Heater port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

pub trait HeaterPort {
    /// Drive the heater at `percent` duty (0–100).
    fn set_duty(&mut self, percent: f32);

    /// Heater fully off.
    fn off(&mut self) {
        self.set_duty(0.0);
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
