//! Remote-console protocol client.
//!
//! Owns one TCP connection to the server, authenticates with the configured
//! secret, and exposes a single "send command, get a [`CommandResult`]"
//! operation. Replies are correlated to commands by request id, so one
//! [`RconClient`] can be shared (`Arc`) between concurrent callers.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod response;
pub mod retry;
pub mod sender;

pub use auth::authenticate;
pub use client::{ConnectionState, RconClient};
pub use config::{
    ClientOptions, ConfigError, RconConfig, DEFAULT_COMMAND_TIMEOUT, ENV_HOST, ENV_PASSWORD,
    ENV_PORT,
};
pub use error::{ClientError, Result};
pub use response::CommandResult;
pub use retry::RetryPolicy;
pub use sender::CommandSender;
