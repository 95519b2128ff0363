//! UART / USB-serial [`Transport`] on ESP-IDF.
//!
//! Wraps an `esp-idf-hal` [`UartDriver`]. Reads never block; writes wait
//! for the driver's TX ring, which is sized well above one response frame.

use esp_idf_hal::delay::{NON_BLOCK, TickType};
use esp_idf_hal::uart::UartDriver;
use esp_idf_svc::sys::EspError;

use crate::rpc::transport::Transport;

/// Upper bound on waiting for the TX FIFO to drain in [`Transport::flush`].
const FLUSH_TIMEOUT_MS: u64 = 20;

pub struct UartTransport<'d> {
    uart: UartDriver<'d>,
}

impl<'d> UartTransport<'d> {
    pub fn new(uart: UartDriver<'d>) -> Self {
        Self { uart }
    }
}

impl Transport for UartTransport<'_> {
    type Error = EspError;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, EspError> {
        self.uart.read(buf, NON_BLOCK)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, EspError> {
        self.uart.write(data)
    }

    fn flush(&mut self) -> Result<(), EspError> {
        self.uart
            .wait_tx_done(TickType::new_millis(FLUSH_TIMEOUT_MS).ticks())
    }

    fn available(&self) -> bool {
        self.uart.remaining_read().is_ok_and(|n| n > 0)
    }
}
