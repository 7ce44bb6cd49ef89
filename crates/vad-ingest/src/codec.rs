//! Wire codec for the fixed 32-byte sensor packet header.
//!
//! Layout (little-endian, packed):
//!
//! ```text
//! offset  0  sensor_id    u32
//! offset  4  timestamp_us u64
//! offset 12  data_type    u8
//! offset 13  reserved     3 bytes
//! offset 16  payload_len  u16
//! offset 18  reserved     2 bytes
//! offset 20  seq          u64
//! offset 28  padding      4 bytes
//! offset 32  payload      payload_len bytes
//! ```
//!
//! Decoding borrows from the input slice and never allocates. Trailing
//! bytes beyond the declared payload are ignored (datagrams carry no
//! trailer; the stream framer guarantees exact length). All reads go
//! through `from_le_bytes`, so big-endian hosts byte-swap automatically.

use thiserror::Error;

/// Fixed header size in bytes.
pub const HEADER_LEN: usize = 32;

/// Maximum payload a packet may declare.
pub const MAX_PAYLOAD: usize = 4096;

/// A decoded sensor packet. Borrows its payload from the input slice; lives
/// only on the processing thread's stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorPacket<'a> {
    pub sensor_id: u32,
    pub timestamp_us: u64,
    pub data_type: u8,
    pub seq: u64,
    pub payload: &'a [u8],
}

/// Why a byte slice failed to decode. Counted per packet; never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Input shorter than the fixed header.
    #[error("packet of {0} bytes is shorter than the {HEADER_LEN}-byte header")]
    ShortHeader(usize),

    /// Header declares a payload larger than [`MAX_PAYLOAD`].
    #[error("declared payload of {0} bytes exceeds the {MAX_PAYLOAD}-byte maximum")]
    PayloadTooLarge(usize),

    /// Input ends before the declared payload does.
    #[error("packet truncated: header declares {declared} payload bytes, {present} present")]
    Truncated { declared: usize, present: usize },
}

#[inline]
fn u16_le(b: &[u8]) -> u16 {
    u16::from_le_bytes([b[0], b[1]])
}

#[inline]
fn u32_le(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

#[inline]
fn u64_le(b: &[u8]) -> u64 {
    u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
}

/// Decodes one sensor packet from `bytes`.
///
/// A packet declaring more payload than is present is an error, never
/// silently truncated. The decoder reads nothing past `bytes`.
pub fn decode(bytes: &[u8]) -> Result<SensorPacket<'_>, ParseError> {
    if bytes.len() < HEADER_LEN {
        return Err(ParseError::ShortHeader(bytes.len()));
    }

    let payload_len = usize::from(u16_le(&bytes[16..18]));
    if payload_len > MAX_PAYLOAD {
        return Err(ParseError::PayloadTooLarge(payload_len));
    }
    if bytes.len() < HEADER_LEN + payload_len {
        return Err(ParseError::Truncated {
            declared: payload_len,
            present: bytes.len() - HEADER_LEN,
        });
    }

    Ok(SensorPacket {
        sensor_id: u32_le(&bytes[0..4]),
        timestamp_us: u64_le(&bytes[4..12]),
        data_type: bytes[12],
        seq: u64_le(&bytes[20..28]),
        payload: &bytes[HEADER_LEN..HEADER_LEN + payload_len],
    })
}

/// Encoded size of a packet carrying `payload_len` bytes.
#[inline]
pub const fn encoded_len(payload_len: usize) -> usize {
    HEADER_LEN + payload_len
}

/// Encodes a packet into `buf`, returning the number of bytes written.
///
/// Returns `None` if `payload` exceeds [`MAX_PAYLOAD`] or `buf` is too
/// small. Reserved and padding bytes are zeroed. Used by the traffic
/// generator and by tests; the ingest path only decodes.
pub fn encode_into(
    buf: &mut [u8],
    sensor_id: u32,
    timestamp_us: u64,
    data_type: u8,
    seq: u64,
    payload: &[u8],
) -> Option<usize> {
    if payload.len() > MAX_PAYLOAD {
        return None;
    }
    let total = encoded_len(payload.len());
    if buf.len() < total {
        return None;
    }

    buf[0..4].copy_from_slice(&sensor_id.to_le_bytes());
    buf[4..12].copy_from_slice(&timestamp_us.to_le_bytes());
    buf[12] = data_type;
    buf[13..16].fill(0);
    buf[16..18].copy_from_slice(&(payload.len() as u16).to_le_bytes());
    buf[18..20].fill(0);
    buf[20..28].copy_from_slice(&seq.to_le_bytes());
    buf[28..32].fill(0);
    buf[HEADER_LEN..total].copy_from_slice(payload);
    Some(total)
}
