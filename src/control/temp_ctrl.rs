//! Temperature controller: outer mode arbiter wrapped around one PID.
//!
//! Link commands for the outer mode and setpoint are staged like the PID's
//! and applied at the start of [`TempController::update`]. Command ids the
//! controller does not own fall through to the embedded PID.

use log::{debug, error, info};

use crate::config::ControllerConfig;
use crate::error::CommandError;
use crate::fsm::context::ControlContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{ControlMode, Fsm, Strategy};
use crate::rpc::frame::CommandView;
use crate::rpc::router::ObjectHandler;

use super::pid::{PidController, PidStatus};
use super::{ensure_capacity, payload_f32, payload_u8};

/// Controller command ids. Anything else is forwarded to the PID.
pub mod cmd {
    pub const READ_STATUS: u8 = 0x01;
    pub const SET_MODE: u8 = 0x20;
    pub const SET_SP: u8 = 0x21;
    /// Diagnostic only: overwritten by the next tick.
    pub const SET_INNER: u8 = 0x22;
}

/// Composite read-back: arbiter state plus the embedded PID record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerStatus {
    pub mode: ControlMode,
    pub inner: Strategy,
    pub setpoint: f32,
    pub pid: PidStatus,
}

impl ControllerStatus {
    /// `u8 mode | u8 inner | 2 reserved | f32 Sp | PidStatus`
    pub const ENCODED_LEN: usize = 8 + PidStatus::ENCODED_LEN;

    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CommandError> {
        ensure_capacity(out, Self::ENCODED_LEN)?;
        out[0] = self.mode as u8;
        out[1] = self.inner as u8;
        out[2..4].fill(0);
        out[4..8].copy_from_slice(&self.setpoint.to_le_bytes());
        self.pid.encode(&mut out[8..])?;
        Ok(Self::ENCODED_LEN)
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::ENCODED_LEN {
            return None;
        }
        Some(Self {
            mode: ControlMode::from_u8(bytes[0])?,
            inner: Strategy::from_u8(bytes[1])?,
            setpoint: f32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            pid: PidStatus::decode(&bytes[8..])?,
        })
    }
}

/// Staged outer-mode and setpoint commands.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlPending {
    /// Raw mode byte; validated when applied.
    pub mode: Option<u8>,
    pub setpoint: Option<f32>,
}

pub struct TempController {
    fsm: Fsm,
    ctx: ControlContext,
    pending: ControlPending,
    faults: u32,
}

impl TempController {
    /// Build a controller in Off.
    pub fn new(config: &ControllerConfig) -> Self {
        let mut ctx = ControlContext::new(config);
        let mut fsm = Fsm::new(build_state_table(), ControlMode::Off);
        fsm.start(&mut ctx);
        Self {
            fsm,
            ctx,
            pending: ControlPending::default(),
            faults: 0,
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn mode(&self) -> ControlMode {
        self.fsm.current_state()
    }

    pub fn inner(&self) -> Strategy {
        self.ctx.inner
    }

    pub fn setpoint(&self) -> f32 {
        self.ctx.setpoint
    }

    pub fn cv(&self) -> f32 {
        self.ctx.pid.cv()
    }

    pub fn pid(&self) -> &PidController {
        &self.ctx.pid
    }

    pub fn pending(&self) -> &ControlPending {
        &self.pending
    }

    /// Faults seen by the arbiter and the embedded PID.
    pub fn fault_count(&self) -> u32 {
        self.faults.wrapping_add(self.ctx.pid.fault_count())
    }

    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            mode: self.mode(),
            inner: self.ctx.inner,
            setpoint: self.ctx.setpoint,
            pid: *self.ctx.pid.status(),
        }
    }

    // ── Per-tick ──────────────────────────────────────────────

    /// One control tick: apply staged commands, arbitrate, run the PID.
    /// Returns the heater duty in percent.
    pub fn update(&mut self, pv: f32, now_ms: u32) -> f32 {
        self.apply_pending();
        self.ctx.pid.apply_pending();
        self.ctx.pv = pv;
        self.fsm.tick(&mut self.ctx);
        self.ctx.pid.update(pv, now_ms)
    }

    /// Drop to Off immediately, discarding any staged mode change.
    pub fn force_off(&mut self) {
        self.pending.mode = None;
        self.fsm.force_transition(ControlMode::Off, &mut self.ctx);
    }

    // ── Command handling ──────────────────────────────────────

    pub fn handle_command(
        &mut self,
        command_id: u8,
        payload: &[u8],
        out: &mut [u8],
    ) -> Result<usize, CommandError> {
        match command_id {
            cmd::READ_STATUS => self.status().encode(out),
            cmd::SET_MODE => {
                let raw = payload_u8(payload)?;
                self.pending.mode = Some(raw);
                debug!("CTRL: staged mode {}", raw);
                Ok(0)
            }
            cmd::SET_SP => {
                self.pending.setpoint = Some(payload_f32(payload)?);
                Ok(0)
            }
            cmd::SET_INNER => {
                let inner =
                    Strategy::from_u8(payload_u8(payload)?).ok_or(CommandError::InvalidValue)?;
                debug!("CTRL: inner override {:?}", inner);
                self.ctx.inner = inner;
                Ok(0)
            }
            other => self.ctx.pid.handle_command(other, payload, out),
        }
    }

    fn apply_pending(&mut self) {
        let p = core::mem::take(&mut self.pending);
        if let Some(sp) = p.setpoint {
            self.ctx.setpoint = sp;
        }
        if let Some(raw) = p.mode {
            match ControlMode::from_u8(raw) {
                Some(mode) => {
                    if mode != self.mode() {
                        info!("CTRL: operator mode {:?}", mode);
                    }
                    self.fsm.force_transition(mode, &mut self.ctx);
                }
                None => {
                    error!("CTRL: invalid mode {} staged, switching off", raw);
                    self.faults = self.faults.wrapping_add(1);
                    self.fsm.force_transition(ControlMode::Off, &mut self.ctx);
                }
            }
        }
    }
}

impl ObjectHandler for TempController {
    fn handle(&mut self, cmd: &CommandView<'_>, out: &mut [u8]) -> Result<usize, CommandError> {
        self.handle_command(cmd.command_id, cmd.payload, out)
    }
}
