//! Unified error types for the heater controller firmware.
//!
//! A single `Error` enum that every subsystem converts into, so the
//! service loop handles failures uniformly. All variants are `Copy` so
//! they pass through the control path without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A framed command was rejected by its handler.
    Command(CommandError),
    /// The thermocouple could not produce a reading.
    Sensor(SensorError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(e) => write!(f, "command: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

/// Why a single command was refused. State is never touched when one of
/// these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// The command id is not known to the addressed object.
    UnknownCommand(u8),
    /// Payload size does not match the field width the command expects.
    PayloadLength { expected: usize, actual: usize },
    /// The caller's output buffer cannot hold the full response record.
    BufferTooSmall { needed: usize, available: usize },
    /// The payload decoded to a value the field cannot hold.
    InvalidValue,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand(id) => write!(f, "unknown command 0x{id:02X}"),
            Self::PayloadLength { expected, actual } => {
                write!(f, "payload length {actual}, expected {expected}")
            }
            Self::BufferTooSmall { needed, available } => {
                write!(f, "output buffer {available} bytes, need {needed}")
            }
            Self::InvalidValue => write!(f, "invalid value"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The converter flagged an open thermocouple input.
    OpenCircuit,
    /// The SPI transaction failed.
    Bus,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenCircuit => write!(f, "thermocouple open circuit"),
            Self::Bus => write!(f, "SPI transfer failed"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
