//! Remote-console packet framing.
//!
//! Every packet on the wire is laid out as:
//! - a 4-byte little-endian length (payload length + 10)
//! - a 4-byte little-endian request id
//! - a 4-byte little-endian packet type
//! - the payload bytes, followed by two NUL bytes
//!
//! [`encode`]/[`decode`] are pure and independent of any connection;
//! [`RconCodec`] plugs the same logic into `tokio_util::codec::Framed`.

pub mod codec;
pub mod error;
pub mod framed;
pub mod packet;

pub use codec::{
    decode, decode_frame, encode, encode_frame, Frame, DEFAULT_MAX_PAYLOAD, HEADER_SIZE,
    LENGTH_PREFIX_SIZE, MIN_PACKET_LENGTH,
};
pub use error::{FrameError, Result};
pub use framed::RconCodec;
pub use packet::{PacketType, AUTH_FAILED_ID};
