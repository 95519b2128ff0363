//! Fixed-period tick scheduling.
//!
//! The service loop spins on the link and asks an [`IntervalTimer`]
//! whether the control tick is due. Timestamps are free-running `u32`
//! milliseconds, so every comparison is done on the wrapped difference.
//!
//! ```text
//!   now ──▶ IntervalTimer::poll_due ──[due]──▶ TempController::update
//!                    │
//!                    └──[not due]──▶ back to link polling
//! ```

use log::debug;

/// Wrap-safe periodic deadline.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    period_ms: u32,
    /// `None` until the first poll, which always fires.
    next_due_ms: Option<u32>,
    /// Deadlines skipped because the caller polled too late.
    overruns: u32,
}

impl IntervalTimer {
    /// A zero period is treated as 1 ms.
    pub fn new(period_ms: u32) -> Self {
        Self {
            period_ms: period_ms.max(1),
            next_due_ms: None,
            overruns: 0,
        }
    }

    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    /// `true` once per period. Deadlines advance by whole periods so the
    /// cadence does not drift; if a full period or more was missed the
    /// schedule restarts from `now_ms` instead of firing a burst.
    pub fn poll_due(&mut self, now_ms: u32) -> bool {
        let Some(due) = self.next_due_ms else {
            self.next_due_ms = Some(now_ms.wrapping_add(self.period_ms));
            return true;
        };
        let late = now_ms.wrapping_sub(due) as i32;
        if late < 0 {
            return false;
        }
        let next = if late as u32 >= self.period_ms {
            self.overruns = self.overruns.wrapping_add(1);
            debug!("IntervalTimer: {} ms behind, resyncing", late);
            now_ms.wrapping_add(self.period_ms)
        } else {
            due.wrapping_add(self.period_ms)
        };
        self.next_due_ms = Some(next);
        true
    }

    /// Milliseconds until the next deadline (0 if already due).
    pub fn remaining_ms(&self, now_ms: u32) -> u32 {
        match self.next_due_ms {
            None => 0,
            Some(due) => {
                let left = due.wrapping_sub(now_ms) as i32;
                left.max(0) as u32
            }
        }
    }

    /// Fire on the next poll.
    pub fn reset(&mut self) {
        self.next_due_ms = None;
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
