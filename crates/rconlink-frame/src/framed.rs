use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::codec::{decode_frame, encode_frame, Frame, DEFAULT_MAX_PAYLOAD};
use crate::error::{FrameError, Result};

/// `tokio_util` codec for remote-console packets.
///
/// Wrap a stream with `Framed::new(stream, RconCodec::default())` to get a
/// `Stream<Item = Result<Frame>>` + `Sink<Frame>`. Partial reads are buffered
/// internally; callers only ever see complete packets.
#[derive(Debug, Clone)]
pub struct RconCodec {
    max_payload_size: usize,
}

impl RconCodec {
    /// Create a codec that rejects inbound payloads above `max_payload_size`.
    pub fn new(max_payload_size: usize) -> Self {
        Self { max_payload_size }
    }

    /// Current inbound payload limit.
    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }
}

impl Default for RconCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD)
    }
}

impl Decoder for RconCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        let frame = decode_frame(src, self.max_payload_size)?;
        if let Some(frame) = &frame {
            trace!(
                request_id = frame.request_id,
                packet_type = %frame.packet_type,
                size = frame.payload.len(),
                "decoded packet"
            );
        }
        Ok(frame)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(FrameError::ConnectionClosed),
        }
    }
}

impl Encoder<Frame> for RconCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        encode_frame(frame.request_id, frame.packet_type, &frame.payload, dst)
    }
}
