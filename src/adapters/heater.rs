//! Heater output over any PWM channel.
//!
//! On target this wraps an LEDC channel driving the SSR; the control
//! core only sees [`HeaterPort`].

use embedded_hal::pwm::SetDutyCycle;
use log::warn;

use crate::app::ports::HeaterPort;

pub struct PwmHeater<P> {
    pwm: P,
    duty: f32,
}

impl<P: SetDutyCycle> PwmHeater<P> {
    /// Starts with the output off.
    pub fn new(mut pwm: P) -> Self {
        if pwm.set_duty_cycle_fully_off().is_err() {
            warn!("heater: could not zero PWM at init");
        }
        Self { pwm, duty: 0.0 }
    }

    /// Last duty successfully written (percent).
    pub fn duty(&self) -> f32 {
        self.duty
    }
}

impl<P: SetDutyCycle> HeaterPort for PwmHeater<P> {
    fn set_duty(&mut self, percent: f32) {
        // NaN maps to off.
        let percent = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0)
        };
        let max = self.pwm.max_duty_cycle();
        let raw = (f32::from(max) * percent / 100.0).round() as u16;
        match self.pwm.set_duty_cycle(raw.min(max)) {
            Ok(()) => self.duty = percent,
            Err(_) => warn!("heater: PWM write failed"),
        }
    }
}
