//! Sensor drivers.
//!
//! Each driver implements [`TemperaturePort`](crate::app::ports::TemperaturePort)
//! so the service loop never touches the bus directly.

pub mod thermocouple;

pub use thermocouple::Max6675;
