//! Velocity-form PID controller for heater duty.
//!
//! Computes the *change* in output each tick from the last three error
//! samples and carries Cv forward, so switching modes never recomputes
//! the output from scratch:
//!
//! ```text
//! err = scale(Sp) - scale(Pv)
//! dCv = Kp·(err - err₁) + Ki·dt·err + (Kd/dt)·(err - 2·err₁ + err₂)
//! Cv  = clamp(Cv + dCv, 0, 100)
//! ```
//!
//! Commands from the link are staged in [`PidPending`] and applied at the
//! start of the next [`PidController::update`], never mid-computation.

use log::{debug, error, warn};

use crate::config::PidTuning;
use crate::error::CommandError;
use crate::rpc::frame::CommandView;
use crate::rpc::router::ObjectHandler;

use super::{ensure_capacity, payload_f32, payload_u8};

/// PID command ids.
pub mod cmd {
    pub const READ_STATUS: u8 = 0x01;
    pub const SET_SP: u8 = 0x10;
    pub const SET_CV: u8 = 0x11;
    pub const SET_KP: u8 = 0x12;
    pub const SET_KI: u8 = 0x13;
    pub const SET_KD: u8 = 0x14;
    pub const SET_PV_MIN: u8 = 0x15;
    pub const SET_PV_MAX: u8 = 0x16;
    pub const SET_MODE: u8 = 0x17;
}

const CV_MIN: f32 = 0.0;
const CV_MAX: f32 = 100.0;

/// Scaling range used when the configured one is unusable.
const SAFE_PV_MIN: f32 = 0.0;
const SAFE_PV_MAX: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PidMode {
    Off = 0,
    Manual = 1,
    Auto = 2,
}

impl PidMode {
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Off),
            1 => Some(Self::Manual),
            2 => Some(Self::Auto),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Status record
// ---------------------------------------------------------------------------

/// Operator-visible PID state, transmitted verbatim by READ_STATUS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidStatus {
    pub sp: f32,
    pub pv: f32,
    /// Control output, always within 0–100 %.
    pub cv: f32,
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    pub pv_min: f32,
    pub pv_max: f32,
    /// Last scaled error.
    pub err: f32,
    pub mode: PidMode,
}

impl PidStatus {
    /// Nine `f32` fields, the mode byte, three reserved zero bytes.
    pub const ENCODED_LEN: usize = 40;

    fn new(tuning: &PidTuning) -> Self {
        Self {
            sp: 0.0,
            pv: 0.0,
            cv: 0.0,
            kp: tuning.kp,
            ki: tuning.ki,
            kd: tuning.kd,
            pv_min: tuning.pv_min,
            pv_max: tuning.pv_max,
            err: 0.0,
            mode: PidMode::Off,
        }
    }

    /// Serialize into `out`. Fails without writing if `out` is too small.
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CommandError> {
        ensure_capacity(out, Self::ENCODED_LEN)?;
        let fields = [
            self.sp, self.pv, self.cv, self.kp, self.ki, self.kd, self.pv_min, self.pv_max,
            self.err,
        ];
        for (chunk, value) in out.chunks_exact_mut(4).zip(fields) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        out[36] = self.mode as u8;
        out[37..Self::ENCODED_LEN].fill(0);
        Ok(Self::ENCODED_LEN)
    }

    /// Parse a record produced by [`encode`](Self::encode).
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::ENCODED_LEN {
            return None;
        }
        let f = |i: usize| {
            let at = i * 4;
            f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        Some(Self {
            sp: f(0),
            pv: f(1),
            cv: f(2),
            kp: f(3),
            ki: f(4),
            kd: f(5),
            pv_min: f(6),
            pv_max: f(7),
            err: f(8),
            mode: PidMode::from_u8(bytes[36])?,
        })
    }
}

// ---------------------------------------------------------------------------
// Staged commands
// ---------------------------------------------------------------------------

/// One slot per mutable field. `None` = nothing staged; a newer command
/// overwrites an older one that has not been applied yet.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidPending {
    pub setpoint: Option<f32>,
    pub manual_cv: Option<f32>,
    pub kp: Option<f32>,
    pub ki: Option<f32>,
    pub kd: Option<f32>,
    pub pv_min: Option<f32>,
    pub pv_max: Option<f32>,
    /// Raw mode byte; validated when applied.
    pub mode: Option<u8>,
}

impl PidPending {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Velocity-form recurrence state. Not wire-visible.
#[derive(Debug, Clone, Copy, Default)]
struct PidHistory {
    err_1: f32,
    err_2: f32,
    /// `None` until the first Auto tick seeds it.
    last_tick_ms: Option<u32>,
}

impl PidHistory {
    fn clear(&mut self) {
        *self = Self::default();
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Velocity-form PID loop. Owns the operator-visible [`PidStatus`], the
/// [`PidPending`] slots filled from the link, the two-sample error history
/// with the last Auto tick time, and a fault counter.
pub struct PidController {
    status: PidStatus,
    pending: PidPending,
    history: PidHistory,
    faults: u32,
}

impl PidController {
    /// Build from tunings. An unusable scaling range is replaced with 0–100.
    pub fn new(tuning: &PidTuning) -> Self {
        let mut status = PidStatus::new(tuning);
        if !valid_range(status.pv_min, status.pv_max) {
            warn!(
                "PID: invalid PV range {}..{}, using {}..{}",
                status.pv_min, status.pv_max, SAFE_PV_MIN, SAFE_PV_MAX
            );
            status.pv_min = SAFE_PV_MIN;
            status.pv_max = SAFE_PV_MAX;
        }
        Self {
            status,
            pending: PidPending::default(),
            history: PidHistory::default(),
            faults: 0,
        }
    }

    pub fn status(&self) -> &PidStatus {
        &self.status
    }

    pub fn pending(&self) -> &PidPending {
        &self.pending
    }

    pub fn mode(&self) -> PidMode {
        self.status.mode
    }

    pub fn cv(&self) -> f32 {
        self.status.cv
    }

    /// Control faults seen (invalid mode, non-finite process value).
    pub fn fault_count(&self) -> u32 {
        self.faults
    }

    // ── Per-tick ──────────────────────────────────────────────

    /// Drain staged commands into the status record.
    ///
    /// Mode is applied first; a staged manual Cv is applied only if the
    /// mode is Manual at that point, otherwise it is discarded.
    pub fn apply_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let p = core::mem::take(&mut self.pending);

        if let Some(raw) = p.mode {
            match PidMode::from_u8(raw) {
                Some(mode) => self.set_mode(mode),
                None => {
                    error!("PID: invalid mode {} staged", raw);
                    self.fault();
                }
            }
        }
        if let Some(sp) = p.setpoint {
            self.status.sp = sp;
        }
        if let Some(kp) = p.kp {
            self.status.kp = kp;
        }
        if let Some(ki) = p.ki {
            self.status.ki = ki;
        }
        if let Some(kd) = p.kd {
            self.status.kd = kd;
        }
        if p.pv_min.is_some() || p.pv_max.is_some() {
            let lo = p.pv_min.unwrap_or(self.status.pv_min);
            let hi = p.pv_max.unwrap_or(self.status.pv_max);
            if valid_range(lo, hi) {
                self.status.pv_min = lo;
                self.status.pv_max = hi;
            } else {
                warn!("PID: rejected PV range {}..{}", lo, hi);
            }
        }
        if let Some(cv) = p.manual_cv {
            if self.status.mode == PidMode::Manual {
                self.status.cv = cv.clamp(CV_MIN, CV_MAX);
            } else {
                debug!("PID: manual Cv {} dropped in {:?}", cv, self.status.mode);
            }
        }
    }

    /// Apply staged commands, record `pv` and return the new output.
    ///
    /// `now_ms` is a free-running millisecond timestamp; wraparound is fine.
    pub fn update(&mut self, pv: f32, now_ms: u32) -> f32 {
        self.apply_pending();
        self.status.pv = pv;

        match self.status.mode {
            PidMode::Off => {
                self.status.cv = 0.0;
                self.track(pv);
                0.0
            }
            PidMode::Manual => {
                self.track(pv);
                self.status.cv
            }
            PidMode::Auto => {
                if !pv.is_finite() {
                    error!("PID: non-finite PV in Auto");
                    self.fault();
                    return 0.0;
                }
                self.step(now_ms)
            }
        }
    }

    /// Force the output to `cv` and clear the error history; Sp takes the
    /// last PV for a bumpless return to Auto.
    pub fn reset(&mut self, cv: f32) {
        self.status.cv = cv.clamp(CV_MIN, CV_MAX);
        self.status.err = 0.0;
        self.history.clear();
        if self.status.pv.is_finite() {
            self.status.sp = self.status.pv;
        }
    }

    // ── Direct control (used by the mode arbiter) ─────────────

    pub fn set_mode(&mut self, mode: PidMode) {
        if mode != self.status.mode {
            debug!("PID: {:?} -> {:?}", self.status.mode, mode);
            self.status.mode = mode;
            self.history.last_tick_ms = None;
        }
    }

    pub fn set_setpoint(&mut self, sp: f32) {
        if sp.is_finite() {
            self.status.sp = sp;
        }
    }

    pub fn set_output(&mut self, cv: f32) {
        if !cv.is_nan() {
            self.status.cv = cv.clamp(CV_MIN, CV_MAX);
        }
    }

    /// Next Auto tick only seeds the timestamp and leaves Cv unchanged.
    pub fn restart_timing(&mut self) {
        self.history.last_tick_ms = None;
    }

    // ── Command handling ──────────────────────────────────────

    /// Stage a command from the link, or serialize the status for a read.
    pub fn handle_command(
        &mut self,
        command_id: u8,
        payload: &[u8],
        out: &mut [u8],
    ) -> Result<usize, CommandError> {
        let p = &mut self.pending;
        match command_id {
            cmd::READ_STATUS => return self.status.encode(out),
            cmd::SET_SP => p.setpoint = Some(payload_f32(payload)?),
            cmd::SET_CV => p.manual_cv = Some(payload_f32(payload)?),
            cmd::SET_KP => p.kp = Some(payload_f32(payload)?),
            cmd::SET_KI => p.ki = Some(payload_f32(payload)?),
            cmd::SET_KD => p.kd = Some(payload_f32(payload)?),
            cmd::SET_PV_MIN => p.pv_min = Some(payload_f32(payload)?),
            cmd::SET_PV_MAX => p.pv_max = Some(payload_f32(payload)?),
            cmd::SET_MODE => p.mode = Some(payload_u8(payload)?),
            other => return Err(CommandError::UnknownCommand(other)),
        }
        debug!("PID: staged cmd 0x{:02X}", command_id);
        Ok(0)
    }

    // ── Internal ──────────────────────────────────────────────

    /// Off/Manual: Sp follows PV and the recurrence restarts on return to Auto.
    fn track(&mut self, pv: f32) {
        if pv.is_finite() {
            self.status.sp = pv;
        }
        self.status.err = 0.0;
        self.history.clear();
    }

    fn step(&mut self, now_ms: u32) -> f32 {
        let Some(last) = self.history.last_tick_ms.replace(now_ms) else {
            return self.status.cv;
        };
        let elapsed_ms = now_ms.wrapping_sub(last) as i32;
        if elapsed_ms <= 0 {
            return self.status.cv;
        }
        let dt = elapsed_ms as f32 * 0.001;

        let s = &mut self.status;
        let err = scale(s.sp, s.pv_min, s.pv_max) - scale(s.pv, s.pv_min, s.pv_max);
        let h = &mut self.history;
        let d_cv = s.kp * (err - h.err_1)
            + s.ki * dt * err
            + (s.kd / dt) * (err - 2.0 * h.err_1 + h.err_2);

        let next = s.cv + d_cv;
        if next.is_nan() {
            warn!("PID: output step not a number, holding Cv");
        } else {
            s.cv = next.clamp(CV_MIN, CV_MAX);
        }
        s.err = err;
        h.err_2 = h.err_1;
        h.err_1 = err;

        s.cv
    }

    /// Invalid state: output to zero, fall back to Off.
    fn fault(&mut self) {
        self.faults = self.faults.wrapping_add(1);
        self.status.cv = 0.0;
        self.status.mode = PidMode::Off;
        self.history.clear();
    }
}

impl ObjectHandler for PidController {
    fn handle(&mut self, cmd: &CommandView<'_>, out: &mut [u8]) -> Result<usize, CommandError> {
        self.handle_command(cmd.command_id, cmd.payload, out)
    }
}

fn valid_range(lo: f32, hi: f32) -> bool {
    lo.is_finite() && hi.is_finite() && lo < hi
}

/// Map `x` onto 0–100 % of `[lo, hi]`; identity for a degenerate range.
fn scale(x: f32, lo: f32, hi: f32) -> f32 {
    if hi <= lo {
        return x;
    }
    ((x - lo) * 100.0 / (hi - lo)).clamp(0.0, 100.0)
}
