//! Concrete state handler functions and table builder.
//!
//! ```text
//!            ┌──────────── operator (SET_MODE) ─────────────┐
//!            ▼                                              │
//!   OFF ◀──▶ OPERATOR_MANUAL ◀──▶ OPERATOR_AUTO ◀──▶ PROGRAMMED_AUTO
//!    ▲                                 │                    │
//!    └───────────[PV not finite]───────┴────────────────────┘
//! ```
//!
//! Under PROGRAMMED_AUTO the inner strategy is picked from `err = Sp - Pv`:
//!
//! ```text
//!   err <= -deadband        → Off          (too hot)
//!   err >= boost threshold  → Boost        (Manual, Cv = boost)
//!   |err| <= deadband       → ClosedLoop   (Auto toward Sp)
//!   otherwise               → FeedForward  (Manual, Cv = feed-forward)
//! ```

use super::context::ControlContext;
use super::{ControlMode, StateDescriptor, Strategy};
use crate::config::ArbiterTuning;
use crate::control::pid::PidMode;
use log::{debug, info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table. Called once per controller.
pub fn build_state_table() -> [StateDescriptor; ControlMode::COUNT] {
    [
        StateDescriptor {
            id: ControlMode::Off,
            name: "Off",
            on_enter: Some(off_enter),
            on_exit: None,
            on_update: off_update,
        },
        StateDescriptor {
            id: ControlMode::OperatorManual,
            name: "OperatorManual",
            on_enter: Some(manual_enter),
            on_exit: None,
            on_update: manual_update,
        },
        StateDescriptor {
            id: ControlMode::OperatorAuto,
            name: "OperatorAuto",
            on_enter: Some(auto_enter),
            on_exit: None,
            on_update: auto_update,
        },
        StateDescriptor {
            id: ControlMode::ProgrammedAuto,
            name: "ProgrammedAuto",
            on_enter: Some(programmed_enter),
            on_exit: Some(programmed_exit),
            on_update: programmed_update,
        },
    ]
}

/// Pick the inner strategy for an error `sp - pv`.
///
/// The too-hot check wins over boost, and both win over the deadband.
pub fn select_strategy(err: f32, tuning: &ArbiterTuning) -> Strategy {
    if err <= -tuning.deadband {
        Strategy::Off
    } else if err >= tuning.boost_err_threshold {
        Strategy::Boost
    } else if err.abs() <= tuning.deadband {
        Strategy::ClosedLoop
    } else {
        Strategy::FeedForward
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  OFF
// ═══════════════════════════════════════════════════════════════════════════

fn off_enter(ctx: &mut ControlContext) {
    ctx.inner = Strategy::Off;
    ctx.pid.set_mode(PidMode::Off);
    ctx.pid.set_output(0.0);
    ctx.pid.restart_timing();
    info!("OFF: heater output disabled");
}

fn off_update(ctx: &mut ControlContext) -> Option<ControlMode> {
    ctx.inner = Strategy::Off;
    ctx.pid.set_mode(PidMode::Off);
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  OPERATOR_MANUAL: output is whatever was last commanded into the PID
// ═══════════════════════════════════════════════════════════════════════════

fn manual_enter(ctx: &mut ControlContext) {
    ctx.inner = Strategy::Off;
    ctx.pid.set_mode(PidMode::Manual);
    ctx.pid.restart_timing();
    info!("MANUAL: holding Cv {:.1}%", ctx.pid.cv());
}

fn manual_update(ctx: &mut ControlContext) -> Option<ControlMode> {
    ctx.inner = Strategy::Off;
    ctx.pid.set_mode(PidMode::Manual);
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  OPERATOR_AUTO: plain closed loop toward the operator setpoint
// ═══════════════════════════════════════════════════════════════════════════

fn auto_enter(ctx: &mut ControlContext) {
    ctx.inner = Strategy::ClosedLoop;
    ctx.pid.set_mode(PidMode::Auto);
    ctx.pid.restart_timing();
    info!("AUTO: regulating to {:.1}", ctx.setpoint);
}

fn auto_update(ctx: &mut ControlContext) -> Option<ControlMode> {
    if !ctx.pv.is_finite() {
        warn!("AUTO: no valid process value, switching off");
        return Some(ControlMode::Off);
    }
    ctx.inner = Strategy::ClosedLoop;
    ctx.pid.set_mode(PidMode::Auto);
    ctx.pid.set_setpoint(ctx.setpoint);
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  PROGRAMMED_AUTO: inner strategy chosen from the live error
// ═══════════════════════════════════════════════════════════════════════════

fn programmed_enter(ctx: &mut ControlContext) {
    ctx.pid.restart_timing();
    info!(
        "PROGRAMMED: target {:.1}, deadband {:.1}",
        ctx.setpoint, ctx.tuning.deadband
    );
}

fn programmed_exit(ctx: &mut ControlContext) {
    ctx.inner = Strategy::Off;
}

fn programmed_update(ctx: &mut ControlContext) -> Option<ControlMode> {
    if !ctx.pv.is_finite() {
        warn!("PROGRAMMED: no valid process value, switching off");
        return Some(ControlMode::Off);
    }

    let strategy = select_strategy(ctx.error(), &ctx.tuning);
    if strategy != ctx.inner {
        debug!("PROGRAMMED: {:?} -> {:?}", ctx.inner, strategy);
    }
    ctx.inner = strategy;

    match strategy {
        Strategy::Off => ctx.pid.set_mode(PidMode::Off),
        Strategy::Boost => {
            ctx.pid.set_mode(PidMode::Manual);
            ctx.pid.set_output(ctx.tuning.boost_cv);
        }
        Strategy::FeedForward => {
            ctx.pid.set_mode(PidMode::Manual);
            ctx.pid.set_output(ctx.tuning.feed_forward_cv);
        }
        Strategy::ClosedLoop => {
            ctx.pid.set_mode(PidMode::Auto);
            ctx.pid.set_setpoint(ctx.setpoint);
        }
    }
    None
}
