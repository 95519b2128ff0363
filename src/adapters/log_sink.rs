//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the logger (UART / USB-CDC console in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | mode={:?}/{:?} | Sp={:.1} Pv={:.2} Cv={:.1}% | \
                     link={} rx={} resync={} | faults={}",
                    t.mode,
                    t.inner,
                    t.setpoint,
                    t.pv,
                    t.cv,
                    if t.link_ok { "UP" } else { "DOWN" },
                    t.frames_received,
                    t.resync_drops,
                    t.faults,
                );
            }
            AppEvent::ModeChanged { from, to } => {
                info!("MODE | {:?} -> {:?}", from, to);
            }
            AppEvent::SensorFault(e) => {
                warn!("SENSOR | fault: {}", e);
            }
            AppEvent::SensorRecovered => {
                info!("SENSOR | recovered");
            }
            AppEvent::LinkLost => {
                warn!("LINK | lost");
            }
            AppEvent::LinkRestored => {
                info!("LINK | restored");
            }
            AppEvent::Started(mode) => {
                info!("START | initial_mode={:?}", mode);
            }
        }
    }
}
