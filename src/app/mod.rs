//! Application core: control orchestration with no direct I/O.
//!
//! The service wires the framed link, the mode arbiter and the control
//! tick together. All interaction with hardware happens through **port
//! traits** defined in [`ports`], keeping this layer testable without real
//! peripherals.

pub mod events;
pub mod ports;
pub mod service;
