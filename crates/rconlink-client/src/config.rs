use std::fmt;
use std::time::Duration;

use rconlink_frame::DEFAULT_MAX_PAYLOAD;
use rconlink_transport::{Endpoint, DEFAULT_CONNECT_TIMEOUT, DEFAULT_HOST, DEFAULT_PORT};

use crate::retry::RetryPolicy;

/// Environment variable naming the server host.
pub const ENV_HOST: &str = "FACTORIO_HOST";
/// Environment variable naming the RCON port.
pub const ENV_PORT: &str = "FACTORIO_RCON_PORT";
/// Environment variable holding the RCON password.
pub const ENV_PASSWORD: &str = "FACTORIO_RCON_PASSWORD";

/// Default per-command reply deadline.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Startup-fatal configuration problems.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("RCON host cannot be empty")]
    EmptyHost,

    #[error("Invalid RCON port: {0}")]
    InvalidPort(String),

    #[error("RCON password cannot be empty")]
    EmptyPassword,
}

/// Where to connect and how to authenticate.
#[derive(Clone, PartialEq, Eq)]
pub struct RconConfig {
    pub host: String,
    pub port: u16,
    /// Sent in plaintext in the auth packet; never logged.
    pub password: String,
}

impl RconConfig {
    pub fn new(host: impl Into<String>, port: u16, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            password: password.into(),
        }
    }

    /// Build from `FACTORIO_HOST`, `FACTORIO_RCON_PORT` and
    /// `FACTORIO_RCON_PASSWORD`, falling back to the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or empty values fall back to
    /// the defaults; an unparsable port is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let host = non_empty(ENV_HOST).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match non_empty(ENV_PORT) {
            Some(raw) => parse_port(&raw)?,
            None => DEFAULT_PORT,
        };
        let password = lookup(ENV_PASSWORD).unwrap_or_default();

        Ok(Self {
            host,
            port,
            password,
        })
    }

    /// Reject empty host, port 0 and empty password.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port.to_string()));
        }
        if self.password.is_empty() {
            return Err(ConfigError::EmptyPassword);
        }
        Ok(())
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }
}

impl Default for RconConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT, String::new())
    }
}

impl fmt::Debug for RconConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RconConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field(
                "password",
                &format_args!("<redacted:{} bytes>", self.password.len()),
            )
            .finish()
    }
}

/// Parse a port in `1..=65535`.
pub fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    let raw = raw.trim();
    match raw.parse::<i64>() {
        Ok(value) if (1..=65535).contains(&value) => Ok(value as u16),
        _ => Err(ConfigError::InvalidPort(raw.to_string())),
    }
}

/// Tunables for connection and command handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Deadline for TCP connect and for the auth exchange, each.
    pub connect_timeout: Duration,
    /// Default reply deadline for [`crate::RconClient::send_command`].
    pub command_timeout: Duration,
    /// Connect retry policy.
    pub retry: RetryPolicy,
    /// Largest inbound payload accepted before the connection is dropped.
    pub max_payload_size: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            retry: RetryPolicy::default(),
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}
