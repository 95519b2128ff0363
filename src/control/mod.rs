//! Control core: velocity-form PID, the mode-arbitrating temperature
//! controller built on it, and a lock-guarded wrapper for targets that
//! poll the link and run the control tick on different threads.

pub mod pid;
pub mod shared;
pub mod temp_ctrl;

use crate::error::CommandError;

/// Decode a payload that must be exactly one little-endian `f32`.
/// Non-finite values are refused so they never reach the control math.
pub(crate) fn payload_f32(payload: &[u8]) -> Result<f32, CommandError> {
    let bytes: [u8; 4] = payload
        .try_into()
        .map_err(|_| CommandError::PayloadLength {
            expected: 4,
            actual: payload.len(),
        })?;
    let value = f32::from_le_bytes(bytes);
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CommandError::InvalidValue)
    }
}

/// Decode a payload that must be exactly one byte.
pub(crate) fn payload_u8(payload: &[u8]) -> Result<u8, CommandError> {
    match payload {
        [b] => Ok(*b),
        _ => Err(CommandError::PayloadLength {
            expected: 1,
            actual: payload.len(),
        }),
    }
}

/// Fail unless `out` can hold a `needed`-byte record.
pub(crate) fn ensure_capacity(out: &[u8], needed: usize) -> Result<(), CommandError> {
    if out.len() < needed {
        return Err(CommandError::BufferTooSmall {
            needed,
            available: out.len(),
        });
    }
    Ok(())
}
