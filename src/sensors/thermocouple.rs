//! MAX6675 K-type thermocouple converter.
//!
//! One SPI read returns a 16-bit big-endian word:
//!
//! ```text
//!  D15   D14..D3        D2      D1   D0
//!  dummy temperature    open    id   tri-state
//!        (0.25 °C/LSB)  input
//! ```
//!
//! The chip needs ~220 ms between conversions; reading faster returns the
//! previous result, which is harmless for a 4 Hz control loop.

use embedded_hal::spi::SpiDevice;
use log::warn;

use crate::app::ports::TemperaturePort;
use crate::error::SensorError;

const OPEN_INPUT_BIT: u16 = 1 << 2;
const CELSIUS_PER_LSB: f32 = 0.25;

pub struct Max6675<SPI> {
    spi: SPI,
}

impl<SPI: SpiDevice> Max6675<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Read the thermocouple in °C.
    pub fn read_celsius(&mut self) -> Result<f32, SensorError> {
        let mut buf = [0u8; 2];
        self.spi.read(&mut buf).map_err(|_| SensorError::Bus)?;
        decode(u16::from_be_bytes(buf))
    }

    pub fn read_fahrenheit(&mut self) -> Result<f32, SensorError> {
        Ok(self.read_celsius()? * 9.0 / 5.0 + 32.0)
    }

    pub fn release(self) -> SPI {
        self.spi
    }
}

fn decode(word: u16) -> Result<f32, SensorError> {
    if word & OPEN_INPUT_BIT != 0 {
        return Err(SensorError::OpenCircuit);
    }
    Ok(f32::from(word >> 3) * CELSIUS_PER_LSB)
}

impl<SPI: SpiDevice> TemperaturePort for Max6675<SPI> {
    fn read_temperature(&mut self) -> Result<f32, SensorError> {
        self.read_celsius().inspect_err(|e| warn!("MAX6675: {e}"))
    }
}
