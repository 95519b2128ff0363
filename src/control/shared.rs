//! Lock-guarded controller for targets where the link poll and the control
//! tick run on different threads.
//!
//! Staging a command and draining staged commands into the control step
//! are each one critical section; nothing finer is needed because all
//! cross-thread traffic goes through the pending slots.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::config::ControllerConfig;
use crate::error::CommandError;
use crate::rpc::frame::CommandView;
use crate::rpc::router::ObjectHandler;

use super::temp_ctrl::{ControllerStatus, TempController};

pub struct SharedTempController<M: RawMutex> {
    inner: Mutex<M, RefCell<TempController>>,
}

impl<M: RawMutex> SharedTempController<M> {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(TempController::new(config))),
        }
    }

    /// Run one control tick under the lock.
    pub fn update(&self, pv: f32, now_ms: u32) -> f32 {
        self.inner.lock(|c| c.borrow_mut().update(pv, now_ms))
    }

    pub fn force_off(&self) {
        self.inner.lock(|c| c.borrow_mut().force_off());
    }

    pub fn status(&self) -> ControllerStatus {
        self.inner.lock(|c| c.borrow().status())
    }

    /// Borrow the controller for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&mut TempController) -> R) -> R {
        self.inner.lock(|c| f(&mut c.borrow_mut()))
    }
}

impl<M: RawMutex> ObjectHandler for &SharedTempController<M> {
    fn handle(&mut self, cmd: &CommandView<'_>, out: &mut [u8]) -> Result<usize, CommandError> {
        self.with(|c| c.handle_command(cmd.command_id, cmd.payload, out))
    }
}
