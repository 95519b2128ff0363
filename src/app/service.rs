//! Controller service: the cooperative main-loop core.
//!
//! [`ControllerService`] owns one [`TempController`] and the framed link
//! that reaches it. The main loop calls [`poll`](ControllerService::poll)
//! as fast as it likes and [`tick`](ControllerService::tick) on every pass;
//! the service decides when the control step is due.
//!
//! ```text
//!   Transport ──▶ ┌─────────────────────────┐ ──▶ EventSink
//! TemperaturePort▶│   ControllerService     │
//!    HeaterPort ◀─│ link · arbiter · PID    │
//!                 └─────────────────────────┘
//! ```

use log::{info, warn};

use crate::config::{ControllerConfig, OBJECT_SLOTS};
use crate::control::temp_ctrl::TempController;
use crate::error::SensorError;
use crate::fsm::ControlMode;
use crate::rpc::engine::{FrameTransport, PollOutcome};
use crate::rpc::router::CommandRouter;
use crate::rpc::transport::Transport;
use crate::scheduler::IntervalTimer;

use super::events::{AppEvent, TelemetryData};
use super::ports::{EventSink, HeaterPort, TemperaturePort};

pub struct ControllerService<T: Transport> {
    controller: TempController,
    link: FrameTransport<T>,
    timer: IntervalTimer,
    object_id: u8,
    force_off_on_link_loss: bool,
    link_up: bool,
    sensor_fault: Option<SensorError>,
    last_pv: f32,
    tick_count: u64,
}

impl<T: Transport> ControllerService<T> {
    /// Build the service. `config` should already be validated; an object
    /// id outside the dispatch table leaves the controller unreachable.
    pub fn new(config: &ControllerConfig, transport: T) -> Self {
        if config.object_id as usize >= OBJECT_SLOTS {
            warn!("service: object id {} is not routable", config.object_id);
        }
        Self {
            controller: TempController::new(config),
            link: FrameTransport::new(transport, config.link_timeout_ms),
            timer: IntervalTimer::new(config.control_period_ms),
            object_id: config.object_id,
            force_off_on_link_loss: config.force_off_on_link_loss,
            link_up: false,
            sensor_fault: None,
            last_pv: f32::NAN,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        let mode = self.controller.mode();
        sink.emit(&AppEvent::Started(mode));
        info!("ControllerService started in {:?}", mode);
    }

    // ── Main-loop entry points ────────────────────────────────

    /// Service the link once. At most one command is handled.
    pub fn poll(&mut self, now_ms: u32) -> PollOutcome {
        let mut router: CommandRouter<'_, OBJECT_SLOTS> = CommandRouter::new();
        router.bind(self.object_id, &mut self.controller);
        self.link.poll(&mut router, now_ms)
    }

    /// Run the control step if it is due. Returns the duty written to the
    /// heater, or `None` when the tick was not due.
    ///
    /// A missing reading is fed to the controller as a non-finite value,
    /// which drops the automatic modes to Off.
    pub fn tick(
        &mut self,
        sensor: &mut impl TemperaturePort,
        heater: &mut impl HeaterPort,
        sink: &mut impl EventSink,
        now_ms: u32,
    ) -> Option<f32> {
        if !self.timer.poll_due(now_ms) {
            return None;
        }
        self.tick_count += 1;
        let prev_mode = self.controller.mode();

        self.supervise_link(now_ms, sink);

        let pv = match sensor.read_temperature() {
            Ok(t) => {
                if self.sensor_fault.take().is_some() {
                    info!("service: sensor recovered at {:.2}", t);
                    sink.emit(&AppEvent::SensorRecovered);
                }
                t
            }
            Err(e) => {
                if self.sensor_fault.is_none() {
                    warn!("service: sensor fault: {}", e);
                    sink.emit(&AppEvent::SensorFault(e));
                }
                self.sensor_fault = Some(e);
                f32::NAN
            }
        };
        self.last_pv = pv;

        let cv = self.controller.update(pv, now_ms);
        heater.set_duty(cv);

        let mode = self.controller.mode();
        if mode != prev_mode {
            sink.emit(&AppEvent::ModeChanged {
                from: prev_mode,
                to: mode,
            });
        }
        Some(cv)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn build_telemetry(&self, now_ms: u32) -> TelemetryData {
        let stats = self.link.stats();
        TelemetryData {
            mode: self.controller.mode(),
            inner: self.controller.inner(),
            setpoint: self.controller.setpoint(),
            pv: self.last_pv,
            cv: self.controller.cv(),
            link_ok: self.link.link_ok(now_ms),
            faults: self.controller.fault_count(),
            frames_received: stats.frames_received,
            resync_drops: stats.resync_drops,
        }
    }

    pub fn mode(&self) -> ControlMode {
        self.controller.mode()
    }

    pub fn controller(&self) -> &TempController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut TempController {
        &mut self.controller
    }

    pub fn link(&self) -> &FrameTransport<T> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut FrameTransport<T> {
        &mut self.link
    }

    /// Control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ── Internal ──────────────────────────────────────────────

    fn supervise_link(&mut self, now_ms: u32, sink: &mut impl EventSink) {
        let ok = self.link.link_ok(now_ms);
        if ok == self.link_up {
            return;
        }
        self.link_up = ok;
        if ok {
            info!("service: link up");
            sink.emit(&AppEvent::LinkRestored);
        } else {
            warn!("service: link lost");
            sink.emit(&AppEvent::LinkLost);
            if self.force_off_on_link_loss {
                self.controller.force_off();
            }
        }
    }
}
