//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter    | Implements    | Connects to                 |
//! |------------|---------------|-----------------------------|
//! | `heater`   | HeaterPort    | LEDC PWM → SSR              |
//! | `log_sink` | EventSink     | Serial log output           |
//! | `serial`   | Transport     | ESP-IDF UART / USB-serial   |
//! | `time`     | -             | ESP32 system timer          |
//!
//! The thermocouple driver implements `TemperaturePort` itself
//! (see [`crate::sensors`]).

pub mod heater;
pub mod log_sink;
#[cfg(target_os = "espidf")]
pub mod serial;
pub mod time;
