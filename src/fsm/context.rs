//! Shared mutable context threaded through every FSM handler.
//!
//! Holds the embedded PID the state handlers drive, the operator setpoint,
//! the derived inner strategy and the latest process value.

use crate::config::{ArbiterTuning, ControllerConfig};
use crate::control::pid::PidController;

use super::Strategy;

/// The context passed to every state handler function.
pub struct ControlContext {
    // -- Control --
    /// Inner PID loop. State handlers set its mode, target and output.
    pub pid: PidController,
    /// Operator setpoint for OperatorAuto and ProgrammedAuto.
    pub setpoint: f32,
    /// Inner strategy chosen on the last tick.
    pub inner: Strategy,
    pub tuning: ArbiterTuning,

    // -- Inputs --
    /// Process value for the current tick.
    pub pv: f32,
}

impl ControlContext {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            pid: PidController::new(&config.pid),
            setpoint: 0.0,
            inner: Strategy::Off,
            tuning: config.arbiter,
            pv: 0.0,
        }
    }

    /// `Sp - Pv` in process units.
    pub fn error(&self) -> f32 {
        self.setpoint - self.pv
    }
}
