//! ControllerService end to end: link commands in, heater duty and
//! events out, with the link-loss and sensor-fault policies.

use heatctl::app::events::AppEvent;
use heatctl::app::service::ControllerService;
use heatctl::config::ControllerConfig;
use heatctl::control::temp_ctrl::cmd;
use heatctl::error::SensorError;
use heatctl::fsm::{ControlMode, Strategy};

use crate::mock_hw::{Host, MockHeater, MockLink, MockThermocouple, RecordingSink};

struct Rig {
    svc: ControllerService<MockLink>,
    host: Host,
    sensor: MockThermocouple,
    heater: MockHeater,
    sink: RecordingSink,
    object_id: u8,
}

impl Rig {
    fn new(config: ControllerConfig, pv: f32) -> Self {
        let mut sink = RecordingSink::new();
        let mut svc = ControllerService::new(&config, MockLink::new());
        svc.start(&mut sink);
        Self {
            svc,
            host: Host::new(),
            sensor: MockThermocouple::steady(pv),
            heater: MockHeater::new(),
            sink,
            object_id: config.object_id,
        }
    }

    fn command(&mut self, command_id: u8, payload: &[u8], now_ms: u32) {
        let (_, req) = self.host.request(self.object_id, command_id, payload);
        self.svc.link_mut().transport_mut().push(&req);
        self.svc.poll(now_ms);
    }

    fn run_program(&mut self, sp: f32, mode: ControlMode, now_ms: u32) {
        self.command(cmd::SET_SP, &sp.to_le_bytes(), now_ms);
        self.command(cmd::SET_MODE, &[mode as u8], now_ms);
    }

    fn tick(&mut self, now_ms: u32) -> Option<f32> {
        self.svc
            .tick(&mut self.sensor, &mut self.heater, &mut self.sink, now_ms)
    }
}

#[test]
fn link_commands_reach_the_heater() {
    let mut rig = Rig::new(ControllerConfig::default(), 100.0);
    rig.run_program(400.0, ControlMode::ProgrammedAuto, 0);

    assert_eq!(rig.tick(0), Some(100.0));
    assert_eq!(rig.heater.last(), Some(100.0));

    let out = rig.svc.link_mut().transport_mut().take_outbound();
    assert_eq!(rig.host.responses(&out).len(), 2);

    assert_eq!(
        rig.sink.events,
        vec![
            AppEvent::Started(ControlMode::Off),
            AppEvent::LinkRestored,
            AppEvent::ModeChanged {
                from: ControlMode::Off,
                to: ControlMode::ProgrammedAuto
            },
        ]
    );
}

#[test]
fn link_loss_forces_off_when_configured() {
    let config = ControllerConfig {
        force_off_on_link_loss: true,
        ..ControllerConfig::default()
    };
    let timeout = config.link_timeout_ms;
    let mut rig = Rig::new(config, 100.0);
    rig.run_program(200.0, ControlMode::OperatorAuto, 0);
    rig.tick(0);
    assert_eq!(rig.svc.mode(), ControlMode::OperatorAuto);

    assert_eq!(rig.tick(timeout), Some(0.0));
    assert_eq!(rig.svc.mode(), ControlMode::Off);
    assert!(rig.sink.contains(&AppEvent::LinkLost));
    assert!(rig.sink.contains(&AppEvent::ModeChanged {
        from: ControlMode::OperatorAuto,
        to: ControlMode::Off
    }));

    // Coming back does not restore the old mode.
    rig.command(cmd::READ_STATUS, &[], timeout + 100);
    rig.tick(timeout + 250);
    assert_eq!(rig.svc.mode(), ControlMode::Off);
    assert_eq!(rig.sink.events.last(), Some(&AppEvent::LinkRestored));
}

#[test]
fn link_loss_only_reported_by_default() {
    let config = ControllerConfig::default();
    let timeout = config.link_timeout_ms;
    let mut rig = Rig::new(config, 100.0);
    rig.run_program(200.0, ControlMode::OperatorAuto, 0);
    rig.tick(0);

    rig.tick(timeout);
    assert!(rig.sink.contains(&AppEvent::LinkLost));
    assert_eq!(rig.svc.mode(), ControlMode::OperatorAuto);

    // Reported once, not every tick.
    rig.tick(timeout + 250);
    let lost = rig
        .sink
        .events
        .iter()
        .filter(|e| **e == AppEvent::LinkLost)
        .count();
    assert_eq!(lost, 1);
}

#[test]
fn sensor_fault_stops_programmed_heating() {
    let mut rig = Rig::new(ControllerConfig::default(), 100.0);
    rig.run_program(400.0, ControlMode::ProgrammedAuto, 0);
    assert_eq!(rig.tick(0), Some(100.0));

    rig.sensor.set(Err(SensorError::OpenCircuit));
    assert_eq!(rig.tick(250), Some(0.0));
    assert_eq!(rig.svc.mode(), ControlMode::Off);
    assert!(rig.sink.contains(&AppEvent::SensorFault(SensorError::OpenCircuit)));
    assert!(rig.sink.contains(&AppEvent::ModeChanged {
        from: ControlMode::ProgrammedAuto,
        to: ControlMode::Off
    }));

    let t = rig.svc.build_telemetry(250);
    assert!(t.pv.is_nan());
    assert_eq!(t.inner, Strategy::Off);

    // Still faulted: no repeat event. Then recovery, which stays Off.
    rig.tick(500);
    rig.sensor.set(Ok(120.0));
    rig.tick(750);
    let faults = rig
        .sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::SensorFault(_)))
        .count();
    assert_eq!(faults, 1);
    assert_eq!(rig.sink.events.last(), Some(&AppEvent::SensorRecovered));
    assert_eq!(rig.svc.mode(), ControlMode::Off);
    assert_eq!(rig.heater.last(), Some(0.0));
}

#[test]
fn manual_mode_survives_sensor_fault() {
    let mut rig = Rig::new(ControllerConfig::default(), 100.0);
    rig.command(cmd::SET_MODE, &[ControlMode::OperatorManual as u8], 0);
    rig.tick(0);
    rig.command(heatctl::control::pid::cmd::SET_CV, &30.0f32.to_le_bytes(), 10);
    assert_eq!(rig.tick(250), Some(30.0));

    rig.sensor.set(Err(SensorError::Bus));
    assert_eq!(rig.tick(500), Some(30.0));
    assert_eq!(rig.svc.mode(), ControlMode::OperatorManual);
}

#[test]
fn telemetry_counts_link_traffic() {
    let mut rig = Rig::new(ControllerConfig::default(), 55.0);
    rig.svc.link_mut().transport_mut().push(&[0x00, 0x01, 0x02]);
    rig.command(cmd::READ_STATUS, &[], 0);
    rig.tick(0);

    let t = rig.svc.build_telemetry(0);
    assert!(t.link_ok);
    assert_eq!(t.frames_received, 1);
    assert_eq!(t.resync_drops, 3);
    assert_eq!(t.pv, 55.0);
    assert_eq!(t.mode, ControlMode::Off);
    assert_eq!(rig.svc.tick_count(), 1);
}
