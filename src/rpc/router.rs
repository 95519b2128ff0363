//! Object-id dispatch table.
//!
//! Each addressable object (a temperature controller, a bare PID loop)
//! implements [`ObjectHandler`]. The router maps the frame's object id to
//! a bound handler; command ids are interpreted by the handler itself.
//!
//! The table borrows its handlers, so a cooperative main loop can rebuild
//! it around each poll and still hand the same controllers to the control
//! tick afterwards.

use log::warn;

use crate::error::CommandError;

use super::frame::CommandView;

/// A command target. Writes at most `out.len()` bytes of response payload
/// and returns how many it wrote.
///
/// On `Err` nothing may have been mutated and the transport answers with
/// an empty payload.
pub trait ObjectHandler {
    fn handle(&mut self, cmd: &CommandView<'_>, out: &mut [u8]) -> Result<usize, CommandError>;
}

/// Outcome of routing one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// No handler bound at that object id.
    NoHandler,
    /// The handler ran.
    Handled(Result<usize, CommandError>),
}

/// Fixed-size table of `N` object slots, indexed by object id.
pub struct CommandRouter<'a, const N: usize> {
    slots: [Option<&'a mut dyn ObjectHandler>; N],
}

impl<const N: usize> Default for CommandRouter<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, const N: usize> CommandRouter<'a, N> {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
        }
    }

    /// Bind `handler` to `object_id`. Returns `false` (and binds nothing)
    /// if the id is outside the table.
    pub fn bind(&mut self, object_id: u8, handler: &'a mut dyn ObjectHandler) -> bool {
        match self.slots.get_mut(object_id as usize) {
            Some(slot) => {
                if slot.is_some() {
                    warn!("router: object {} rebound", object_id);
                }
                *slot = Some(handler);
                true
            }
            None => {
                warn!("router: object id {} outside table of {}", object_id, N);
                false
            }
        }
    }

    pub fn is_bound(&self, object_id: u8) -> bool {
        matches!(self.slots.get(object_id as usize), Some(Some(_)))
    }

    /// Route `cmd` to its object's handler.
    pub fn dispatch(&mut self, cmd: &CommandView<'_>, out: &mut [u8]) -> Dispatch {
        match self.slots.get_mut(cmd.object_id as usize) {
            Some(Some(handler)) => Dispatch::Handled(handler.handle(cmd, out)),
            _ => Dispatch::NoHandler,
        }
    }
}
