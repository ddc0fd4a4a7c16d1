use std::borrow::Cow;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::packet::PacketType;

/// Size of the little-endian length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Header after the length prefix: request id (4) + packet type (4).
pub const HEADER_SIZE: usize = 8;

/// Two NUL bytes close every packet.
pub const TERMINATOR: [u8; 2] = [0x00, 0x00];

/// Smallest legal value of the length prefix (empty payload).
pub const MIN_PACKET_LENGTH: usize = HEADER_SIZE + TERMINATOR.len();

/// Default maximum payload size accepted from the wire: 4 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 4 * 1024 * 1024;

const MAX_ENCODABLE_PAYLOAD: usize = i32::MAX as usize - MIN_PACKET_LENGTH;

/// A single remote-console packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Client-chosen id echoed by the server in its reply.
    pub request_id: i32,
    /// Packet type.
    pub packet_type: PacketType,
    /// Payload without the NUL terminator.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(request_id: i32, packet_type: PacketType, payload: impl Into<Bytes>) -> Self {
        Self {
            request_id,
            packet_type,
            payload: payload.into(),
        }
    }

    /// Payload decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    /// Value of the length prefix for this frame.
    pub fn length_field(&self) -> usize {
        self.payload.len() + MIN_PACKET_LENGTH
    }

    /// The total wire size of this frame (prefix + header + payload + terminator).
    pub fn wire_size(&self) -> usize {
        LENGTH_PREFIX_SIZE + self.length_field()
    }
}

/// Encode a packet into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────┬────────────┬────────────┬──────────────┬──────────┐
/// │ Length     │ Request id │ Type       │ Payload      │ 0x00 0x00│
/// │ (4B LE)    │ (4B LE)    │ (4B LE)    │ (Length-10)  │          │
/// └────────────┴────────────┴────────────┴──────────────┴──────────┘
/// ```
pub fn encode_frame(
    request_id: i32,
    packet_type: PacketType,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    if payload.len() > MAX_ENCODABLE_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_ENCODABLE_PAYLOAD,
        });
    }
    let length = payload.len() + MIN_PACKET_LENGTH;
    dst.reserve(LENGTH_PREFIX_SIZE + length);
    dst.put_i32_le(length as i32);
    dst.put_i32_le(request_id);
    dst.put_i32_le(packet_type.as_i32());
    dst.put_slice(payload);
    dst.put_slice(&TERMINATOR);
    Ok(())
}

/// Decode a packet from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete packet yet.
/// On success, consumes the packet bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    if src.len() < LENGTH_PREFIX_SIZE {
        return Ok(None);
    }

    let length = (&src[..LENGTH_PREFIX_SIZE]).get_i32_le();
    if length < MIN_PACKET_LENGTH as i32 {
        return Err(FrameError::InvalidLength(length));
    }
    let length = length as usize;

    let payload_len = length - MIN_PACKET_LENGTH;
    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = LENGTH_PREFIX_SIZE + length;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    let mut header = &src[LENGTH_PREFIX_SIZE..LENGTH_PREFIX_SIZE + HEADER_SIZE];
    let request_id = header.get_i32_le();
    let packet_type = PacketType::try_from(header.get_i32_le())?;

    if src[total - TERMINATOR.len()..total] != TERMINATOR {
        return Err(FrameError::MissingTerminator);
    }

    src.advance(LENGTH_PREFIX_SIZE + HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();
    src.advance(TERMINATOR.len());

    Ok(Some(Frame {
        request_id,
        packet_type,
        payload,
    }))
}

/// Encode a single packet into a fresh buffer.
pub fn encode(packet_type: PacketType, request_id: i32, payload: &[u8]) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + MIN_PACKET_LENGTH + payload.len());
    encode_frame(request_id, packet_type, payload, &mut buf)?;
    Ok(buf.freeze())
}

/// Decode the first complete packet in `bytes`.
///
/// Trailing bytes after that packet are ignored.
pub fn decode(bytes: &[u8]) -> Result<Frame> {
    let mut buf = BytesMut::from(bytes);
    match decode_frame(&mut buf, MAX_ENCODABLE_PAYLOAD)? {
        Some(frame) => Ok(frame),
        None => {
            let need = if bytes.len() < LENGTH_PREFIX_SIZE {
                LENGTH_PREFIX_SIZE
            } else {
                LENGTH_PREFIX_SIZE + (&bytes[..LENGTH_PREFIX_SIZE]).get_i32_le() as usize
            };
            Err(FrameError::Incomplete {
                have: bytes.len(),
                need,
            })
        }
    }
}
