//! Host-side helpers for talking to the controller.
//!
//! Mirrors what an HMI or poller does on the other end of the link:
//! number each request, then pick the matching response out of a byte
//! stream that may contain stale or corrupted frames.

use heapless::Vec;

use super::codec::{ReceiveBuffer, Scan};
use super::engine::DEFAULT_CAPACITY;
use super::frame::{FrameHeader, HEADER_SIZE, encode_frame};

/// Largest payload a default-sized response frame can carry.
pub const MAX_RESPONSE_PAYLOAD: usize = DEFAULT_CAPACITY - HEADER_SIZE;

/// Builds request frames with a wrapping sequence number.
#[derive(Debug, Default)]
pub struct RequestEncoder {
    seq: u8,
}

impl RequestEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode a request into `out`. Returns the sequence number used and
    /// the frame length, or `None` if the frame does not fit.
    pub fn encode(
        &mut self,
        object_id: u8,
        command_id: u8,
        payload: &[u8],
        out: &mut [u8],
    ) -> Option<(u8, usize)> {
        let seq = self.seq.wrapping_add(1);
        let header = FrameHeader {
            length: 0,
            seq,
            object_id,
            command_id,
            flags: 0,
        };
        let n = encode_frame(&header, payload, out)?;
        self.seq = seq;
        Some((seq, n))
    }

    /// Sequence number of the last encoded request.
    pub fn last_seq(&self) -> u8 {
        self.seq
    }
}

/// One response frame, payload copied out of the stream. `P` bounds the
/// payload; the default fits any frame a default-sized link can send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response<const P: usize = MAX_RESPONSE_PAYLOAD> {
    pub header: FrameHeader,
    pub payload: Vec<u8, P>,
}

/// Resynchronising response extractor.
///
/// `N` is the receive buffer size and `P` the largest payload kept. A
/// frame whose payload exceeds `P` is skipped and counted, never cut short.
#[derive(Default)]
pub struct ResponseReader<const N: usize = DEFAULT_CAPACITY, const P: usize = MAX_RESPONSE_PAYLOAD> {
    rx: ReceiveBuffer<N>,
    oversized: u32,
}

impl<const N: usize, const P: usize> ResponseReader<N, P> {
    pub fn new() -> Self {
        Self {
            rx: ReceiveBuffer::new(),
            oversized: 0,
        }
    }

    /// Append received bytes. Returns how many were accepted.
    pub fn feed(&mut self, data: &[u8]) -> usize {
        self.rx.feed(data)
    }

    /// Frames dropped because their payload did not fit `P`.
    pub fn oversized(&self) -> u32 {
        self.oversized
    }

    /// Next complete frame in the stream, skipping corrupted input.
    pub fn next_response(&mut self) -> Option<Response<P>> {
        loop {
            match self.rx.scan().scan {
                Scan::Incomplete => return None,
                Scan::BadLength => {}
                Scan::Frame(header) => {
                    let len = header.length as usize;
                    let body = &self.rx.as_slice()[HEADER_SIZE..len];
                    let mut payload = Vec::new();
                    let fits = payload.extend_from_slice(body).is_ok();
                    self.rx.consume(len);
                    if fits {
                        return Some(Response { header, payload });
                    }
                    self.oversized = self.oversized.wrapping_add(1);
                    log::warn!(
                        "client: dropping seq={} with {}-byte payload (limit {})",
                        header.seq,
                        len - HEADER_SIZE,
                        P
                    );
                }
            }
        }
    }

    /// Next response carrying `seq`; responses to older requests are dropped.
    pub fn response_for(&mut self, seq: u8) -> Option<Response<P>> {
        while let Some(resp) = self.next_response() {
            if resp.header.seq == seq {
                return Some(resp);
            }
            log::debug!("client: dropping stale response seq={}", resp.header.seq);
        }
        None
    }
}
