use std::future::Future;
use std::time::Duration;

use rconlink_transport::Endpoint;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};

/// Bounded connect retry with exponential backoff.
///
/// The delay after failed attempt `n` (1-based) is `base_delay * 2^(n-1)`:
/// with the defaults that is 1 s, 2 s, then giving up after the third try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero behaves as one.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// A policy that tries exactly once.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Backoff before the attempt following failed attempt `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempts run out. Exhaustion is reported as
    /// [`ClientError::ConnectFailed`] naming `endpoint`.
    pub async fn run<T, F, Fut>(&self, endpoint: &Endpoint, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.attempts();
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => {
                    debug!(%endpoint, attempt, "connect attempt succeeded");
                    return Ok(value);
                }
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) if attempt >= attempts => {
                    warn!(%endpoint, attempt, error = %err, "connect attempts exhausted");
                    return Err(ClientError::ConnectFailed {
                        host: endpoint.host.clone(),
                        port: endpoint.port,
                        attempts,
                        last_error: err.to_string(),
                    });
                }
                Err(err) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        %endpoint,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "connect attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
