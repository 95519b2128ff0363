//! Frame envelope shared by requests and responses.
//!
//! Wire format (all integers little-endian):
//! ```text
//! ┌────────────┬────────────┬─────┬────────┬─────────┬───────┬─────────────────┐
//! │ Magic (4B) │ Length (2B)│ Seq │ Object │ Command │ Flags │ Payload (N B)   │
//! │ 0xDEADBEEF │ hdr + N    │ u8  │ u8     │ u8      │ u8    │ Length - 10     │
//! └────────────┴────────────┴─────┴────────┴─────────┴───────┴─────────────────┘
//! ```
//!
//! The envelope is payload-agnostic. Flags are reserved and echoed back
//! unchanged in the response.

/// Frame start marker.
pub const MAGIC: u32 = 0xDEAD_BEEF;

/// Bytes before the payload.
pub const HEADER_SIZE: usize = 10;

/// Decoded header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Total frame length, header included.
    pub length: u16,
    pub seq: u8,
    pub object_id: u8,
    pub command_id: u8,
    pub flags: u8,
}

impl FrameHeader {
    /// Read the header fields from the first [`HEADER_SIZE`] bytes of `bytes`.
    ///
    /// Returns `None` if `bytes` is too short or does not start with [`MAGIC`].
    /// The declared length is returned as-is; range checks belong to the caller.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_SIZE || read_magic(bytes) != Some(MAGIC) {
            return None;
        }
        Some(Self {
            length: u16::from_le_bytes([bytes[4], bytes[5]]),
            seq: bytes[6],
            object_id: bytes[7],
            command_id: bytes[8],
            flags: bytes[9],
        })
    }

    /// Payload length implied by the declared total length.
    pub fn payload_len(&self) -> usize {
        (self.length as usize).saturating_sub(HEADER_SIZE)
    }

    fn write_to(&self, out: &mut [u8]) {
        out[..4].copy_from_slice(&MAGIC.to_le_bytes());
        out[4..6].copy_from_slice(&self.length.to_le_bytes());
        out[6] = self.seq;
        out[7] = self.object_id;
        out[8] = self.command_id;
        out[9] = self.flags;
    }
}

/// Borrowed view of one decoded command frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandView<'a> {
    pub seq: u8,
    pub object_id: u8,
    pub command_id: u8,
    pub flags: u8,
    pub payload: &'a [u8],
}

impl<'a> CommandView<'a> {
    pub fn new(header: &FrameHeader, payload: &'a [u8]) -> Self {
        Self {
            seq: header.seq,
            object_id: header.object_id,
            command_id: header.command_id,
            flags: header.flags,
            payload,
        }
    }
}

/// Little-endian u32 at the start of `bytes`, if there are four bytes.
pub fn read_magic(bytes: &[u8]) -> Option<u32> {
    let word: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
    Some(u32::from_le_bytes(word))
}

/// Encode a complete frame into `out_buf`.
///
/// `length` in the written header is computed from `payload`; the value in
/// `header.length` is ignored. Returns the number of bytes written, or
/// `None` if the frame does not fit in `out_buf` or in a `u16` length.
pub fn encode_frame(header: &FrameHeader, payload: &[u8], out_buf: &mut [u8]) -> Option<usize> {
    let total = HEADER_SIZE + payload.len();
    let length = u16::try_from(total).ok()?;
    if total > out_buf.len() {
        return None;
    }

    FrameHeader { length, ..*header }.write_to(out_buf);
    out_buf[HEADER_SIZE..total].copy_from_slice(payload);

    Some(total)
}

/// Write only the header for a payload already placed at
/// `out_buf[HEADER_SIZE..HEADER_SIZE + payload_len]`.
pub(crate) fn encode_header_in_place(
    header: &FrameHeader,
    payload_len: usize,
    out_buf: &mut [u8],
) -> Option<usize> {
    let total = HEADER_SIZE + payload_len;
    let length = u16::try_from(total).ok()?;
    if total > out_buf.len() {
        return None;
    }
    FrameHeader { length, ..*header }.write_to(out_buf);
    Some(total)
}
