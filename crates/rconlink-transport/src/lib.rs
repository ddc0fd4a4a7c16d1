//! TCP transport for remote-console connections.
//!
//! The lowest layer of rconlink. It resolves an [`Endpoint`] and opens a
//! [`tokio::net::TcpStream`] within a bounded connect timeout. Everything
//! above (framing, authentication, correlation) builds on the stream
//! returned here.

pub mod endpoint;
pub mod error;
pub mod tcp;

pub use endpoint::{Endpoint, DEFAULT_HOST, DEFAULT_PORT};
pub use error::{Result, TransportError};
pub use tcp::{connect, connect_with_timeout, DEFAULT_CONNECT_TIMEOUT};
