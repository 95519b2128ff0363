//! Fuzz target: `FrameTransport::poll`
//!
//! Streams arbitrary bytes into the framed link with a controller bound
//! and asserts that polling never panics, the receive buffer stays within
//! capacity, and every accepted frame is answered.
//!
//! cargo fuzz run fuzz_frame_transport

#![no_main]

use libfuzzer_sys::fuzz_target;
use heatctl::config::ControllerConfig;
use heatctl::control::temp_ctrl::TempController;
use heatctl::rpc::engine::FrameTransport;
use heatctl::rpc::router::CommandRouter;
use heatctl::rpc::transport::Transport;

struct Feed<'a>(&'a [u8]);

impl Transport for Feed<'_> {
    type Error = ();

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
        // Odd chunk sizes exercise partial headers.
        let n = buf.len().min(self.0.len()).min(7);
        buf[..n].copy_from_slice(&self.0[..n]);
        self.0 = &self.0[n..];
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }

    fn available(&self) -> bool {
        !self.0.is_empty()
    }
}

fuzz_target!(|data: &[u8]| {
    let config = ControllerConfig::default();
    let mut ctrl = TempController::new(&config);
    let mut link: FrameTransport<Feed<'_>> = FrameTransport::new(Feed(data), config.link_timeout_ms);

    let mut now = 0u32;
    while link.transport().available() || link.buffered() > 0 {
        let mut router: CommandRouter<'_, 8> = CommandRouter::new();
        router.bind(config.object_id, &mut ctrl);
        link.poll(&mut router, now);
        assert!(link.buffered() <= 256, "receive buffer over capacity");

        // Staged commands must be applicable whatever they contain.
        ctrl.update(25.0, now);
        now = now.wrapping_add(250);
        if now > 1_000_000 {
            break;
        }
    }

    let stats = link.stats();
    assert_eq!(stats.frames_received, stats.frames_sent);
});
