//! Controller configuration parameters
//!
//! Start-up tunings for one temperature control loop. Runtime changes
//! arrive over the command link and are not written back here.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Size of the service's object dispatch table; object ids must be below this.
pub const OBJECT_SLOTS: usize = 8;

/// PID gains and process-value scaling range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidTuning {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Process value mapped to 0 %.
    pub pv_min: f32,
    /// Process value mapped to 100 %.
    pub pv_max: f32,
}

impl Default for PidTuning {
    fn default() -> Self {
        Self {
            kp: 2.0,
            ki: 0.1,
            kd: 0.0,
            // MAX6675 measurement span
            pv_min: 0.0,
            pv_max: 1024.0,
        }
    }
}

/// Thresholds for the programmed-auto inner strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArbiterTuning {
    /// Error band (deg) around Sp treated as regulated.
    pub deadband: f32,
    /// Error (deg) at or above which the heater is driven flat out.
    pub boost_err_threshold: f32,
    /// Output (%) while boosting.
    pub boost_cv: f32,
    /// Output (%) in the feed-forward region.
    pub feed_forward_cv: f32,
}

impl Default for ArbiterTuning {
    fn default() -> Self {
        Self {
            deadband: 150.0,
            boost_err_threshold: 160.0,
            boost_cv: 100.0,
            feed_forward_cv: 10.0,
        }
    }
}

/// Core controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub pid: PidTuning,
    pub arbiter: ArbiterTuning,
    /// Object id the controller answers to on the command link.
    pub object_id: u8,
    /// Control tick period (milliseconds)
    pub control_period_ms: u32,
    /// Link is reported down after this long without a valid frame (milliseconds)
    pub link_timeout_ms: u32,
    /// Drop to Off when the link goes down.
    pub force_off_on_link_loss: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            pid: PidTuning::default(),
            arbiter: ArbiterTuning::default(),
            object_id: 1,
            control_period_ms: 250, // 4 Hz
            link_timeout_ms: 2000,
            force_off_on_link_loss: false,
        }
    }
}

impl ControllerConfig {
    /// Parse a JSON provisioning blob and validate it.
    pub fn from_json(json: &[u8]) -> Result<Self> {
        let config: Self =
            serde_json::from_slice(json).map_err(|_| Error::Config("malformed JSON"))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the control loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        let p = &self.pid;
        if !(p.kp.is_finite() && p.ki.is_finite() && p.kd.is_finite()) {
            return Err(Error::Config("PID gains must be finite"));
        }
        if !(p.pv_min.is_finite() && p.pv_max.is_finite()) || p.pv_min >= p.pv_max {
            return Err(Error::Config("pv_min must be below pv_max"));
        }
        let a = &self.arbiter;
        if !(a.deadband >= 0.0 && a.deadband.is_finite()) {
            return Err(Error::Config("deadband must be a non-negative number"));
        }
        if !a.boost_err_threshold.is_finite() {
            return Err(Error::Config("boost threshold must be finite"));
        }
        if !(0.0..=100.0).contains(&a.boost_cv) || !(0.0..=100.0).contains(&a.feed_forward_cv) {
            return Err(Error::Config("arbiter outputs must be within 0-100%"));
        }
        if self.object_id as usize >= OBJECT_SLOTS {
            return Err(Error::Config("object_id outside dispatch table"));
        }
        if self.control_period_ms == 0 || self.link_timeout_ms == 0 {
            return Err(Error::Config("periods must be non-zero"));
        }
        Ok(())
    }
}
