use std::time::Duration;

use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};

/// Default upper bound for a single connect attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connect to a remote-console endpoint using [`DEFAULT_CONNECT_TIMEOUT`].
pub async fn connect(endpoint: &Endpoint) -> Result<TcpStream> {
    connect_with_timeout(endpoint, DEFAULT_CONNECT_TIMEOUT).await
}

/// Connect to a remote-console endpoint, giving up after `timeout`.
///
/// Every resolved address is tried in order; the last connect error is
/// reported if none accepts. Nagle is disabled since the protocol is
/// strictly request/response with small frames.
pub async fn connect_with_timeout(endpoint: &Endpoint, timeout: Duration) -> Result<TcpStream> {
    match tokio::time::timeout(timeout, connect_any(endpoint)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout {
            endpoint: endpoint.clone(),
            timeout,
        }),
    }
}

async fn connect_any(endpoint: &Endpoint) -> Result<TcpStream> {
    let addrs = tokio::net::lookup_host(endpoint.authority())
        .await
        .map_err(|source| TransportError::Resolve {
            endpoint: endpoint.clone(),
            source,
        })?;

    let mut last_err = None;
    for addr in addrs {
        debug!(%addr, "connecting");
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                info!(%endpoint, %addr, "tcp connection established");
                return Ok(stream);
            }
            Err(err) => {
                debug!(%addr, error = %err, "connect attempt failed");
                last_err = Some(err);
            }
        }
    }

    Err(TransportError::Connect {
        endpoint: endpoint.clone(),
        source: last_err.unwrap_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "host resolved to no addresses",
            )
        }),
    })
}
