/// Errors that can occur during packet encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The length prefix is smaller than the fixed header plus terminator.
    #[error("invalid packet length {0} (minimum 10)")]
    InvalidLength(i32),

    /// The packet type is not one the protocol defines.
    #[error("unknown packet type {0}")]
    UnknownPacketType(i32),

    /// The payload is not followed by the two NUL terminator bytes.
    #[error("packet payload is not NUL-terminated")]
    MissingTerminator,

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A buffer handed to [`crate::decode`] ended before the packet did.
    #[error("incomplete packet ({have} of {need} bytes)")]
    Incomplete { have: usize, need: usize },

    /// An I/O error occurred while reading or writing packets.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete packet was received.
    #[error("connection closed (incomplete packet)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
