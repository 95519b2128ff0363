//! Fuzz target: `TempController::handle_command`
//!
//! Feeds arbitrary command ids and payloads straight to the controller,
//! then runs a tick, checking the heater output stays within 0–100 %.
//!
//! cargo fuzz run fuzz_command_payloads

#![no_main]

use libfuzzer_sys::fuzz_target;
use heatctl::config::ControllerConfig;
use heatctl::control::temp_ctrl::TempController;

fuzz_target!(|data: &[u8]| {
    let mut ctrl = TempController::new(&ControllerConfig::default());
    let mut out = [0u8; 64];
    let mut now = 0u32;

    // Records: [cmd, len, payload..., pv_byte]
    let mut rest = data;
    while let [command_id, len, tail @ ..] = rest {
        let len = (*len as usize % 8).min(tail.len());
        let (payload, after) = tail.split_at(len);
        if let Ok(n) = ctrl.handle_command(*command_id, payload, &mut out) {
            assert!(n <= out.len());
        }

        let pv = after.first().map_or(25.0, |b| *b as f32 * 4.0);
        let cv = ctrl.update(pv, now);
        assert!((0.0..=100.0).contains(&cv), "cv {cv} out of range");

        now = now.wrapping_add(250);
        rest = after.get(1..).unwrap_or(&[]);
    }
});
