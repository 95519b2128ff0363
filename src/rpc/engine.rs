//! Frame transport: turns a byte stream into one command/response
//! transaction per poll.
//!
//! The transport owns the channel and both buffers and is driven by a
//! cooperative loop:
//!
//! ```text
//!  Transport::read ──▶ ReceiveBuffer ──scan──▶ CommandView ──▶ CommandRouter
//!                                                                   │
//!  Transport::write ◀── tx buffer ◀── response envelope ◀── payload ┘
//! ```
//!
//! Every poll that decodes a frame sends exactly one response with the
//! same seq/object/command/flags, whether or not the handler succeeded.
//! Malformed input only ever shows up in [`TransportStats`].

use log::{debug, warn};

use super::codec::{ReceiveBuffer, Scan};
use super::frame::{CommandView, FrameHeader, HEADER_SIZE, encode_header_in_place};
use super::router::{CommandRouter, Dispatch};
use super::transport::Transport;

/// Default receive and transmit buffer size (one USB HID report).
pub const DEFAULT_CAPACITY: usize = 256;

/// Upper bound on transport reads per poll, so a flooding host cannot
/// starve the control tick.
const MAX_DRAIN_READS: usize = 8;

/// Cumulative link counters. Read-only to callers; never halt polling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Receive buffer discarded because it was full with input pending.
    pub overflows: u32,
    /// Junk bytes skipped while hunting for the frame marker.
    pub resync_drops: u32,
    /// Polls where the buffer did not start with the marker.
    pub bad_magic: u32,
    /// Marker followed by an impossible declared length.
    pub bad_length: u32,
    /// Frames addressed to an unbound object id.
    pub no_handler: u32,
    /// Frames whose handler returned an error.
    pub handler_errors: u32,
    pub frames_received: u32,
    pub frames_sent: u32,
    /// Handler claimed more payload than the transmit buffer holds.
    pub tx_truncated: u32,
    pub read_errors: u32,
    pub write_errors: u32,
}

/// What one [`FrameTransport::poll`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// No complete frame buffered.
    NoFrame,
    /// A bad declared length was skipped; retry on the next poll.
    Rejected,
    /// One frame was dispatched and answered.
    Responded {
        seq: u8,
        object_id: u8,
        command_id: u8,
        dispatch: Dispatch,
    },
}

/// Framed command/response endpoint over a byte transport.
pub struct FrameTransport<T: Transport, const RX: usize = DEFAULT_CAPACITY, const TX: usize = DEFAULT_CAPACITY> {
    transport: T,
    rx: ReceiveBuffer<RX>,
    tx: [u8; TX],
    stats: TransportStats,
    link_timeout_ms: u32,
    last_frame_ms: Option<u32>,
}

impl<T: Transport, const RX: usize, const TX: usize> FrameTransport<T, RX, TX> {
    pub fn new(transport: T, link_timeout_ms: u32) -> Self {
        const { assert!(TX > HEADER_SIZE && TX <= u16::MAX as usize) };
        Self {
            transport,
            rx: ReceiveBuffer::new(),
            tx: [0; TX],
            stats: TransportStats::default(),
            link_timeout_ms,
            last_frame_ms: None,
        }
    }

    /// Service the link once: read what is available, and if a complete
    /// frame is buffered, dispatch it and send its response.
    ///
    /// At most one frame is handled per call even when several are buffered.
    pub fn poll<const N: usize>(
        &mut self,
        router: &mut CommandRouter<'_, N>,
        now_ms: u32,
    ) -> PollOutcome {
        self.drain_input();

        let report = self.rx.scan();
        if report.resync_dropped > 0 {
            self.stats.bad_magic = self.stats.bad_magic.wrapping_add(1);
            self.stats.resync_drops = self
                .stats
                .resync_drops
                .wrapping_add(report.resync_dropped as u32);
            debug!("link: resync dropped {} bytes", report.resync_dropped);
        }

        let header = match report.scan {
            Scan::Incomplete => return PollOutcome::NoFrame,
            Scan::BadLength => {
                self.stats.bad_length = self.stats.bad_length.wrapping_add(1);
                warn!("link: bad frame length, dropping one byte");
                return PollOutcome::Rejected;
            }
            Scan::Frame(header) => header,
        };

        let frame_len = header.length as usize;
        let view = CommandView::new(&header, &self.rx.as_slice()[HEADER_SIZE..frame_len]);
        let out = &mut self.tx[HEADER_SIZE..];
        let capacity = out.len();
        let dispatch = router.dispatch(&view, out);

        let payload_len = match dispatch {
            Dispatch::NoHandler => {
                self.stats.no_handler = self.stats.no_handler.wrapping_add(1);
                warn!(
                    "link: no handler for object {} (cmd 0x{:02X})",
                    header.object_id, header.command_id
                );
                0
            }
            Dispatch::Handled(Ok(n)) if n > capacity => {
                self.stats.tx_truncated = self.stats.tx_truncated.wrapping_add(1);
                warn!("link: response of {} bytes truncated to {}", n, capacity);
                capacity
            }
            Dispatch::Handled(Ok(n)) => n,
            Dispatch::Handled(Err(e)) => {
                self.stats.handler_errors = self.stats.handler_errors.wrapping_add(1);
                debug!(
                    "link: object {} cmd 0x{:02X} rejected: {}",
                    header.object_id, header.command_id, e
                );
                0
            }
        };

        self.rx.consume(frame_len);
        self.stats.frames_received = self.stats.frames_received.wrapping_add(1);
        self.last_frame_ms = Some(now_ms);

        self.send_response(&header, payload_len);

        PollOutcome::Responded {
            seq: header.seq,
            object_id: header.object_id,
            command_id: header.command_id,
            dispatch,
        }
    }

    /// True while a valid frame has arrived within the link timeout.
    /// What to do when it turns false is the caller's policy.
    pub fn link_ok(&self, now_ms: u32) -> bool {
        self.last_frame_ms
            .is_some_and(|t| now_ms.wrapping_sub(t) < self.link_timeout_ms)
    }

    pub fn stats(&self) -> &TransportStats {
        &self.stats
    }

    /// Bytes currently waiting in the receive buffer.
    pub fn buffered(&self) -> usize {
        self.rx.len()
    }

    /// Forget partial input and link liveness (e.g. after a reconnect).
    pub fn reset(&mut self) {
        self.rx.clear();
        self.last_frame_ms = None;
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    // ── Internal ──────────────────────────────────────────────

    fn drain_input(&mut self) {
        for _ in 0..MAX_DRAIN_READS {
            if !self.transport.available() {
                break;
            }
            if self.rx.is_full() {
                self.stats.overflows = self.stats.overflows.wrapping_add(1);
                warn!("link: receive buffer overflow, discarding {} bytes", self.rx.len());
                self.rx.clear();
            }
            match self.transport.read(self.rx.spare_mut()) {
                Ok(0) => break,
                Ok(n) => self.rx.commit(n),
                Err(e) => {
                    self.stats.read_errors = self.stats.read_errors.wrapping_add(1);
                    warn!("link: read failed: {:?}", e);
                    break;
                }
            }
        }
    }

    fn send_response(&mut self, request: &FrameHeader, payload_len: usize) {
        let Some(total) = encode_header_in_place(request, payload_len, &mut self.tx) else {
            self.stats.write_errors = self.stats.write_errors.wrapping_add(1);
            return;
        };

        let mut written = 0;
        while written < total {
            match self.transport.write(&self.tx[written..total]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) => {
                    warn!("link: write failed: {:?}", e);
                    break;
                }
            }
        }
        if written < total {
            self.stats.write_errors = self.stats.write_errors.wrapping_add(1);
            return;
        }
        if let Err(e) = self.transport.flush() {
            self.stats.write_errors = self.stats.write_errors.wrapping_add(1);
            warn!("link: flush failed: {:?}", e);
            return;
        }
        self.stats.frames_sent = self.stats.frames_sent.wrapping_add(1);
    }
}
