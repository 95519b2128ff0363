//! Function-pointer finite state machine for the outer control mode.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  StateTable                                                   │
//! │  ┌────────────────┬───────────┬──────────┬─────────────────┐  │
//! │  │ ControlMode    │ on_enter  │ on_exit  │ on_update       │  │
//! │  ├────────────────┼───────────┼──────────┼─────────────────┤  │
//! │  │ Off            │ fn(ctx)   │ -        │ fn(ctx)->Option │  │
//! │  │ OperatorManual │ fn(ctx)   │ -        │ fn(ctx)->Option │  │
//! │  │ OperatorAuto   │ fn(ctx)   │ -        │ fn(ctx)->Option │  │
//! │  │ ProgrammedAuto │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option │  │
//! │  └────────────────┴───────────┴──────────┴─────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state, which
//! drives the embedded PID's mode, setpoint and output. If it returns
//! `Some(next)`, the engine runs `on_exit` for the current state, then
//! `on_enter` for the next. Operator mode changes go through
//! [`Fsm::force_transition`].

pub mod context;
pub mod states;

use context::ControlContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Outer control mode. Must stay in sync with [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ControlMode {
    Off = 0,
    OperatorManual = 1,
    OperatorAuto = 2,
    ProgrammedAuto = 3,
}

impl ControlMode {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 4;

    /// Decode a wire byte. `None` for anything outside the enumeration.
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Off),
            1 => Some(Self::OperatorManual),
            2 => Some(Self::OperatorAuto),
            3 => Some(Self::ProgrammedAuto),
            _ => None,
        }
    }

    /// Convert a table index back to `ControlMode`. Panics on out-of-range in
    /// debug builds; returns `Off` in release.
    pub fn from_index(idx: usize) -> Self {
        match u8::try_from(idx).ok().and_then(Self::from_u8) {
            Some(mode) => mode,
            None => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Off
            }
        }
    }
}

/// Inner heating strategy. Only meaningful under
/// [`ControlMode::ProgrammedAuto`]; recomputed from the error every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Strategy {
    Off = 0,
    Boost = 1,
    FeedForward = 2,
    ClosedLoop = 3,
}

impl Strategy {
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Off),
            1 => Some(Self::Boost),
            2 => Some(Self::FeedForward),
            3 => Some(Self::ClosedLoop),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut ControlContext);

/// Per-tick handler. Returns `Some(next)` to trigger a transition.
pub type StateUpdateFn = fn(&mut ControlContext) -> Option<ControlMode>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
pub struct StateDescriptor {
    pub id: ControlMode,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
///
/// Owns the state table; the [`ControlContext`] is threaded through every
/// handler call by the owner.
pub struct Fsm {
    /// Fixed-size table indexed by `ControlMode as usize`.
    table: [StateDescriptor; ControlMode::COUNT],
    current: usize,
    tick_count: u64,
    /// Tick at which the current state was entered.
    state_entry_tick: u64,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; ControlMode::COUNT], initial: ControlMode) -> Self {
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            state_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut ControlContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one tick.
    ///
    /// 1. Call `on_update` for the current state.
    /// 2. If it returns `Some(next)`, execute the transition:
    ///    `on_exit(current)` → update pointer → `on_enter(next)`.
    pub fn tick(&mut self, ctx: &mut ControlContext) {
        self.tick_count += 1;

        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// Immediate transition, used for operator mode commands and link-loss
    /// shutdown. No-op if already in `next`.
    pub fn force_transition(&mut self, next: ControlMode, ctx: &mut ControlContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> ControlMode {
        ControlMode::from_index(self.current)
    }

    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.state_entry_tick
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: ControlMode, ctx: &mut ControlContext) {
        let next_idx = next_id as usize;

        info!(
            "FSM transition: {} -> {} after {} ticks",
            self.table[self.current].name,
            self.table[next_idx].name,
            self.ticks_in_current_state()
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.state_entry_tick = self.tick_count;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
