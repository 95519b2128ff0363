//! Resynchronising receive buffer.
//!
//! Bytes from the transport are appended to a fixed-capacity buffer whose
//! valid bytes always occupy `[0, len)`. [`ReceiveBuffer::scan`] looks for
//! the next frame at the front of the buffer:
//!
//! 1. Bytes before the first [`MAGIC`] are dropped.
//! 2. With fewer than [`HEADER_SIZE`] bytes after the marker, wait.
//! 3. A declared length below the header size or above capacity drops a
//!    single byte, so a coincidental marker inside junk cannot wedge the
//!    buffer.
//! 4. A partial frame waits without consuming anything.
//! 5. A complete frame is reported; the caller consumes it once handled.
//!
//! A single `Transport::read` may return part of a header, part of a
//! payload, or several frames concatenated.

use super::frame::{FrameHeader, HEADER_SIZE, MAGIC};

const MAGIC_BYTES: [u8; 4] = MAGIC.to_le_bytes();

/// Result of one scan over the buffer front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    /// No complete frame buffered yet.
    Incomplete,
    /// A complete frame starts at index 0.
    Frame(FrameHeader),
    /// The marker was followed by an impossible length; one byte was dropped.
    BadLength,
}

/// What a scan did, for the transport's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    /// Junk bytes discarded while looking for the marker.
    pub resync_dropped: usize,
    pub scan: Scan,
}

/// Fixed-capacity byte accumulator.
pub struct ReceiveBuffer<const N: usize> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> Default for ReceiveBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ReceiveBuffer<N> {
    pub const fn new() -> Self {
        Self {
            buf: [0; N],
            len: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// The valid bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Free space a transport read can fill; follow with [`commit`](Self::commit).
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.len..]
    }

    /// Mark `n` bytes of the spare region as valid.
    pub fn commit(&mut self, n: usize) {
        self.len = (self.len + n).min(N);
    }

    /// Append as much of `data` as fits. Returns the number of bytes taken.
    pub fn feed(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(N - self.len);
        self.buf[self.len..self.len + n].copy_from_slice(&data[..n]);
        self.len += n;
        n
    }

    /// Drop `n` bytes from the front, shifting the remainder down.
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.len);
        self.buf.copy_within(n..self.len, 0);
        self.len -= n;
    }

    /// Discard everything (e.g. after an overflow or a link reset).
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Locate the next frame at the buffer front. Never surfaces more than
    /// one frame; the caller must [`consume`](Self::consume) it.
    pub fn scan(&mut self) -> ScanReport {
        let resync_dropped = self.align_to_magic();

        let scan = if self.len < HEADER_SIZE {
            Scan::Incomplete
        } else {
            match FrameHeader::decode(self.as_slice()) {
                Some(header) => {
                    let length = header.length as usize;
                    if length < HEADER_SIZE || length > N {
                        self.consume(1);
                        Scan::BadLength
                    } else if self.len < length {
                        Scan::Incomplete
                    } else {
                        Scan::Frame(header)
                    }
                }
                None => Scan::Incomplete,
            }
        };

        ScanReport {
            resync_dropped,
            scan,
        }
    }

    /// Shift the first marker occurrence to index 0. Without a full marker,
    /// keep only a trailing partial marker. Returns bytes dropped.
    fn align_to_magic(&mut self) -> usize {
        let data = self.as_slice();
        let found = data
            .windows(MAGIC_BYTES.len())
            .position(|w| w == MAGIC_BYTES);

        let drop = match found {
            Some(pos) => pos,
            None => {
                let keep = (1..MAGIC_BYTES.len())
                    .rev()
                    .find(|&k| k <= data.len() && data[data.len() - k..] == MAGIC_BYTES[..k])
                    .unwrap_or(0);
                data.len() - keep
            }
        };

        if drop > 0 {
            self.consume(drop);
        }
        drop
    }
}
