//! HeatCtl firmware library.
//!
//! Exposes the control core, the framed command link and the adapters for
//! integration testing and host-side tooling. ESP-IDF-specific code is
//! guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod fsm;
pub mod rpc;
pub mod scheduler;
pub mod sensors;

pub use error::{CommandError, Error, Result, SensorError};
