//! HeatCtl firmware main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  UartTransport   Max6675        PwmHeater    LogEventSink      │
//! │  (Transport)     (Temperature)  (Heater)     (EventSink)       │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │          ControllerService (cooperative loop)          │    │
//! │  │  FrameTransport · TempController · PID                 │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pinout (ESP32-S3 DevKit):
//!
//! | Signal          | GPIO |
//! |-----------------|------|
//! | MAX6675 SCK     | 12   |
//! | MAX6675 SO      | 13   |
//! | MAX6675 CS      | 10   |
//! | Heater SSR      | 4    |
//! | Link UART TX/RX | 43/44 |
#![deny(unused_must_use)]

use anyhow::{Result, anyhow};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::AnyIOPin;
use esp_idf_hal::ledc::config::TimerConfig;
use esp_idf_hal::ledc::{LedcDriver, LedcTimerDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::spi::config::Config as SpiConfig;
use esp_idf_hal::spi::{SpiDeviceDriver, SpiDriver, SpiDriverConfig};
use esp_idf_hal::uart::UartDriver;
use esp_idf_hal::uart::config::Config as UartConfig;
use esp_idf_hal::units::FromValueType;
use log::info;

use heatctl::adapters::heater::PwmHeater;
use heatctl::adapters::log_sink::LogEventSink;
use heatctl::adapters::serial::UartTransport;
use heatctl::adapters::time::MonotonicClock;
use heatctl::app::events::AppEvent;
use heatctl::app::ports::EventSink;
use heatctl::app::service::ControllerService;
use heatctl::config::ControllerConfig;
use heatctl::scheduler::IntervalTimer;
use heatctl::sensors::Max6675;

/// Telemetry log cadence.
const TELEMETRY_PERIOD_MS: u32 = 5_000;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("HeatCtl v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration (compiled-in defaults) ───────────────
    let config = ControllerConfig::default();
    config.validate().map_err(|e| anyhow!("{e}"))?;

    // ── 3. Peripherals ────────────────────────────────────────
    let p = Peripherals::take()?;

    // MAX6675 tops out at 4.3 MHz; 1 MHz leaves margin on long leads.
    let spi = SpiDriver::new_without_sdo(
        p.spi2,
        p.pins.gpio12,
        p.pins.gpio13,
        &SpiDriverConfig::new(),
    )?;
    let spi = SpiDeviceDriver::new(spi, Some(p.pins.gpio10), &SpiConfig::new().baudrate(1.MHz().into()))?;
    let mut thermocouple = Max6675::new(spi);

    let timer = LedcTimerDriver::new(p.ledc.timer0, &TimerConfig::new().frequency(100.Hz().into()))?;
    let pwm = LedcDriver::new(p.ledc.channel0, &timer, p.pins.gpio4)?;
    let mut heater = PwmHeater::new(pwm);

    let uart = UartDriver::new(
        p.uart0,
        p.pins.gpio43,
        p.pins.gpio44,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::new().baudrate(115_200.Hz()),
    )?;

    // ── 4. Service ────────────────────────────────────────────
    let mut sink = LogEventSink::new();
    let mut service = ControllerService::new(&config, UartTransport::new(uart));
    service.start(&mut sink);

    let clock = MonotonicClock::new();
    let mut telemetry = IntervalTimer::new(TELEMETRY_PERIOD_MS);

    info!("System ready. Entering control loop.");

    // ── 5. Cooperative loop ───────────────────────────────────
    loop {
        let now = clock.now_ms();
        service.poll(now);
        service.tick(&mut thermocouple, &mut heater, &mut sink, now);

        if telemetry.poll_due(now) {
            sink.emit(&AppEvent::Telemetry(service.build_telemetry(now)));
        }

        // Yield so the idle task can feed the task watchdog.
        FreeRtos::delay_ms(1);
    }
}
