//! Temperature controller driven end to end through the framed link, the
//! way an HMI would: stage commands, let the control tick apply them, read
//! the composite status back.

use heatctl::config::{ControllerConfig, OBJECT_SLOTS};
use heatctl::control::pid::{self, PidMode};
use heatctl::control::temp_ctrl::{ControllerStatus, TempController, cmd};
use heatctl::fsm::{ControlMode, Strategy};
use heatctl::rpc::client::Response;
use heatctl::rpc::engine::FrameTransport;
use heatctl::rpc::router::CommandRouter;

use crate::mock_hw::{Host, MockLink};

const OBJECT: u8 = 1;
const PERIOD_MS: u32 = 250;

struct Bench {
    link: FrameTransport<MockLink>,
    ctrl: TempController,
    host: Host,
    now_ms: u32,
}

impl Bench {
    fn new() -> Self {
        let config = ControllerConfig::default();
        Self {
            link: FrameTransport::new(MockLink::new(), config.link_timeout_ms),
            ctrl: TempController::new(&config),
            host: Host::new(),
            now_ms: 0,
        }
    }

    /// Send one request and return the matching response.
    fn send(&mut self, command_id: u8, payload: &[u8]) -> Response {
        let (seq, req) = self.host.request(OBJECT, command_id, payload);
        self.link.transport_mut().push(&req);

        let mut router: CommandRouter<'_, OBJECT_SLOTS> = CommandRouter::new();
        router.bind(OBJECT, &mut self.ctrl);
        self.link.poll(&mut router, self.now_ms);

        let out = self.link.transport_mut().take_outbound();
        self.host.reader.feed(&out);
        self.host.reader.response_for(seq).expect("response for request")
    }

    fn send_f32(&mut self, command_id: u8, value: f32) -> Response {
        self.send(command_id, &value.to_le_bytes())
    }

    fn status(&mut self) -> ControllerStatus {
        let resp = self.send(cmd::READ_STATUS, &[]);
        ControllerStatus::decode(&resp.payload).expect("valid status record")
    }

    fn tick(&mut self, pv: f32) -> f32 {
        let cv = self.ctrl.update(pv, self.now_ms);
        self.now_ms += PERIOD_MS;
        cv
    }
}

#[test]
fn operator_auto_regulates_toward_setpoint() {
    let mut b = Bench::new();
    assert!(b.send_f32(cmd::SET_SP, 200.0).payload.is_empty());
    b.send(cmd::SET_MODE, &[ControlMode::OperatorAuto as u8]);

    // Staged, not yet applied.
    assert_eq!(b.status().mode, ControlMode::Off);

    // First Auto tick only seeds the timestamp.
    assert_eq!(b.tick(100.0), 0.0);
    let cv = b.tick(100.0);

    // err = (200 - 100) / 1024 * 100 %, one 250 ms step from zero.
    let err = 100.0 * 100.0 / 1024.0;
    let expected = 2.0 * err + 0.1 * 0.25 * err;
    assert!((cv - expected).abs() < 1e-3, "cv {cv} vs {expected}");

    let s = b.status();
    assert_eq!(s.mode, ControlMode::OperatorAuto);
    assert_eq!(s.inner, Strategy::ClosedLoop);
    assert_eq!(s.setpoint, 200.0);
    assert_eq!(s.pid.mode, PidMode::Auto);
    assert_eq!(s.pid.sp, 200.0);
    assert_eq!(s.pid.cv, cv);
}

#[test]
fn programmed_auto_walks_the_strategies() {
    let mut b = Bench::new();
    b.send_f32(cmd::SET_SP, 500.0);
    b.send(cmd::SET_MODE, &[ControlMode::ProgrammedAuto as u8]);

    // Cold start: flat out.
    assert_eq!(b.tick(300.0), 100.0);
    assert_eq!(b.status().inner, Strategy::Boost);

    // Outside the deadband but below the boost threshold.
    assert_eq!(b.tick(345.0), 10.0);
    assert_eq!(b.status().inner, Strategy::FeedForward);

    // Inside the deadband the PID takes over from the feed-forward output.
    b.tick(460.0);
    let s = b.status();
    assert_eq!(s.inner, Strategy::ClosedLoop);
    assert_eq!(s.pid.mode, PidMode::Auto);
    assert_eq!(s.pid.sp, 500.0);

    // Overshoot: heater off, still in programmed mode.
    assert_eq!(b.tick(700.0), 0.0);
    let s = b.status();
    assert_eq!(s.mode, ControlMode::ProgrammedAuto);
    assert_eq!(s.inner, Strategy::Off);
}

#[test]
fn manual_output_held_until_changed() {
    let mut b = Bench::new();
    b.send(cmd::SET_MODE, &[ControlMode::OperatorManual as u8]);
    b.tick(25.0);
    b.send_f32(pid::cmd::SET_CV, 35.0);
    assert_eq!(b.tick(25.0), 35.0);
    assert_eq!(b.tick(30.0), 35.0);

    b.send_f32(pid::cmd::SET_CV, 250.0);
    assert_eq!(b.tick(30.0), 100.0);
    assert_eq!(b.status().pid.mode, PidMode::Manual);
}

#[test]
fn manual_output_dropped_outside_manual() {
    let mut b = Bench::new();
    b.send_f32(pid::cmd::SET_CV, 40.0);
    assert_eq!(b.tick(25.0), 0.0);

    b.send(cmd::SET_MODE, &[ControlMode::OperatorManual as u8]);
    assert_eq!(b.tick(25.0), 0.0);
}

#[test]
fn invalid_mode_faults_to_off() {
    let mut b = Bench::new();
    b.send_f32(cmd::SET_SP, 150.0);
    b.send(cmd::SET_MODE, &[ControlMode::OperatorAuto as u8]);
    b.tick(100.0);
    assert_eq!(b.ctrl.mode(), ControlMode::OperatorAuto);

    // Accepted on the wire, rejected when applied.
    let resp = b.send(cmd::SET_MODE, &[9]);
    assert!(resp.payload.is_empty());
    assert_eq!(b.link.stats().handler_errors, 0);

    assert_eq!(b.tick(100.0), 0.0);
    assert_eq!(b.ctrl.mode(), ControlMode::Off);
    assert_eq!(b.ctrl.fault_count(), 1);
}

#[test]
fn pid_commands_fall_through() {
    let mut b = Bench::new();
    b.send_f32(pid::cmd::SET_KP, 4.0);
    b.send_f32(pid::cmd::SET_KI, 0.5);
    assert_eq!(b.status().pid.kp, 2.0);

    b.tick(20.0);
    let s = b.status();
    assert_eq!(s.pid.kp, 4.0);
    assert_eq!(s.pid.ki, 0.5);

    // Status reads always return the composite record.
    let resp = b.send(pid::cmd::READ_STATUS, &[]);
    assert_eq!(resp.payload.len(), ControllerStatus::ENCODED_LEN);
}

#[test]
fn unknown_command_rejected() {
    let mut b = Bench::new();
    let resp = b.send(0x7F, &[1, 2, 3]);
    assert!(resp.payload.is_empty());
    assert_eq!(resp.header.command_id, 0x7F);
    assert_eq!(b.link.stats().handler_errors, 1);
}

#[test]
fn scaling_limits_apply_together() {
    let mut b = Bench::new();

    // Inverted pair: neither limit takes effect.
    b.send_f32(pid::cmd::SET_PV_MIN, 500.0);
    b.send_f32(pid::cmd::SET_PV_MAX, 100.0);
    b.tick(20.0);
    let s = b.status();
    assert_eq!((s.pid.pv_min, s.pid.pv_max), (0.0, 1024.0));

    // Moving both at once past each other is fine.
    b.send_f32(pid::cmd::SET_PV_MIN, 1100.0);
    b.send_f32(pid::cmd::SET_PV_MAX, 1500.0);
    b.tick(20.0);
    let s = b.status();
    assert_eq!((s.pid.pv_min, s.pid.pv_max), (1100.0, 1500.0));
}

#[test]
fn non_finite_setpoint_refused() {
    let mut b = Bench::new();
    let resp = b.send_f32(cmd::SET_SP, f32::NAN);
    assert!(resp.payload.is_empty());
    assert_eq!(b.link.stats().handler_errors, 1);
    assert_eq!(b.ctrl.pending().setpoint, None);

    b.send_f32(pid::cmd::SET_SP, f32::INFINITY);
    assert_eq!(b.link.stats().handler_errors, 2);
}

#[test]
fn latest_staged_value_wins() {
    let mut b = Bench::new();
    b.send_f32(cmd::SET_SP, 100.0);
    b.send_f32(cmd::SET_SP, 180.0);
    b.tick(20.0);
    assert_eq!(b.status().setpoint, 180.0);
}

#[test]
fn inner_override_lasts_until_next_tick() {
    let mut b = Bench::new();
    b.send(cmd::SET_INNER, &[Strategy::Boost as u8]);
    assert_eq!(b.status().inner, Strategy::Boost);

    b.tick(20.0);
    assert_eq!(b.status().inner, Strategy::Off);

    b.send(cmd::SET_INNER, &[9]);
    assert_eq!(b.link.stats().handler_errors, 1);
}

#[test]
fn lost_sensor_drops_auto_to_off() {
    let mut b = Bench::new();
    b.send_f32(cmd::SET_SP, 300.0);
    b.send(cmd::SET_MODE, &[ControlMode::ProgrammedAuto as u8]);
    assert_eq!(b.tick(100.0), 100.0);

    assert_eq!(b.tick(f32::NAN), 0.0);
    assert_eq!(b.ctrl.mode(), ControlMode::Off);
    assert_eq!(b.ctrl.inner(), Strategy::Off);
}
