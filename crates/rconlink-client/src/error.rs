use std::time::Duration;

/// Errors that can occur in client operations.
///
/// Wire-originated failures never cross [`crate::RconClient::send_command`];
/// they are folded into a failed [`crate::CommandResult`] using this type's
/// `Display` text.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] rconlink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] rconlink_frame::FrameError),

    /// Socket failure or timeout while connecting.
    #[error("connection error: {0}")]
    Connection(String),

    /// The server answered the auth packet with request id -1.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Every connect attempt allowed by the retry policy failed.
    #[error(
        "failed to connect to {host}:{port} after {attempts} attempt(s): {last_error}. \
         Check that the server is running with RCON enabled and that the host, \
         port and password are correct"
    )]
    ConnectFailed {
        host: String,
        port: u16,
        attempts: u32,
        last_error: String,
    },

    /// No connection and the transparent reconnect failed.
    #[error("not connected: {0}")]
    NotConnected(String),

    /// No reply arrived before the command deadline.
    #[error("Command timeout after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The connection dropped while a command was in flight.
    #[error("connection lost: {0}")]
    Disconnected(String),

    /// A reply could not be parsed as the expected JSON shape.
    #[error("failed to parse response: {0}")]
    ProtocolParse(String),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

impl ClientError {
    /// Whether a fresh connect attempt could plausibly succeed.
    ///
    /// Rejected credentials and bad configuration do not change between
    /// attempts, so retrying them only delays the report.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Authentication(_) | Self::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
