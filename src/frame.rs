//! Wire format for the packet streaming protocol.
//!
//! Every frame starts with a fixed nine-byte header: four magic bytes, a
//! four-byte little-endian payload length and a one-byte compression flag,
//! followed by exactly `payload_len` payload bytes. There are no other
//! delimiters on the wire, so header validation is the only defence against
//! a desynchronised or hostile sender.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Magic bytes opening every frame header.
pub const MAGIC: [u8; 4] = [0xde, 0xef, 0xec, 0xe0];

/// Length of the payload length field in bytes.
const LEN_FIELD_LEN: usize = 4;

/// Length of the compression flag field in bytes.
const FLAG_FIELD_LEN: usize = 1;

/// Total header length preceding the payload.
pub const HEADER_LEN: usize = MAGIC.len() + LEN_FIELD_LEN + FLAG_FIELD_LEN;

/// Errors raised while validating a frame header.
///
/// Any of these is a protocol violation and terminates the connection that
/// produced it; there is no resynchronisation at this layer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The first four bytes did not match [`MAGIC`].
    #[error("invalid magic bytes in frame header")]
    BadMagic,

    /// The declared payload length exceeds the receive buffer.
    #[error("declared payload length {len} exceeds limit {max}")]
    Oversized {
        /// Length declared by the peer.
        len: usize,
        /// Maximum payload length the receive buffer admits.
        max: usize,
    },
}

/// Validated frame header fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    /// Number of payload bytes following the header.
    pub payload_len: usize,
    /// Whether the payload must be decompressed before output.
    pub compressed: bool,
}

impl FrameHeader {
    /// Decode and validate a header from the first [`HEADER_LEN`] bytes of
    /// `buf`.
    ///
    /// The magic is checked before the length field so a desynchronised
    /// stream fails immediately rather than being interpreted as an absurd
    /// length. `max_frame_bytes` is the size of the receive buffer; the
    /// declared payload must fit alongside the header.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::BadMagic`] or [`FrameError::Oversized`]; both
    /// are fatal for the connection.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `buf` is shorter than [`HEADER_LEN`].
    pub fn decode(buf: &[u8], max_frame_bytes: usize) -> Result<Self, FrameError> {
        debug_assert!(buf.len() >= HEADER_LEN, "header buffer too short");
        if buf[..MAGIC.len()] != MAGIC {
            return Err(FrameError::BadMagic);
        }
        let declared = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let max = max_frame_bytes.saturating_sub(HEADER_LEN);
        // A length that does not fit usize cannot fit the buffer either.
        let payload_len = usize::try_from(declared)
            .map_err(|_| FrameError::Oversized { len: usize::MAX, max })?;
        if payload_len > max {
            return Err(FrameError::Oversized {
                len: payload_len,
                max,
            });
        }
        Ok(Self {
            payload_len,
            compressed: buf[MAGIC.len() + LEN_FIELD_LEN] != 0,
        })
    }
}

/// One decoded protocol message.
///
/// Constructed only from a validated header plus exactly `payload_len`
/// payload bytes; consumed once by the decompression stage and never
/// retained afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Raw payload bytes, possibly compressed.
    pub payload: Bytes,
    /// Whether `payload` must be decompressed before output.
    pub compressed: bool,
}

/// Encode a complete frame, header and payload, for transmission.
///
/// Used by senders and tests; the receiver never encodes frames.
///
/// # Errors
///
/// Returns [`FrameError::Oversized`] if the payload length does not fit the
/// four-byte length field.
pub fn encode_frame(payload: &[u8], compressed: bool) -> Result<Bytes, FrameError> {
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::Oversized {
        len: payload.len(),
        max: u32::MAX as usize,
    })?;
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_slice(&MAGIC);
    buf.put_u32_le(len);
    buf.put_u8(u8::from(compressed));
    buf.put_slice(payload);
    Ok(buf.freeze())
}
