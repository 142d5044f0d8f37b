// Licensed under the AGPL-3.0 (https://www.gnu.org/licenses/agpl-3.0.html).

//! Retry decorator for transports.
//!
//! The dispatch worker itself never retries: an element is released after
//! exactly one `send` attempt (at-most-once). When redelivery is wanted it
//! is layered *around* the transport instead, so the engine's contract
//! stays untouched.
//!
//! # Example
//!
//! ```
//! use forward_engine::{NoopTransport, RetryConfig, RetryingTransport};
//! use std::time::Duration;
//!
//! let transport = RetryingTransport::new(NoopTransport, RetryConfig::default());
//!
//! // Tighter policy for an interactive path
//! let config = RetryConfig {
//!     max_retries: 1,
//!     initial_delay: Duration::from_millis(10),
//!     ..Default::default()
//! };
//! let transport = RetryingTransport::new(NoopTransport, config);
//! ```

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::warn;

use crate::element::SendElement;
use crate::transport::{Transport, TransportError};

/// Exponential-backoff retry policy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Additional attempts after the first failure.
    pub max_retries: usize,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Ceiling for the backoff delay.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each retry.
    pub factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            factor: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (1-based).
    fn delay_for(&self, attempt: usize) -> Duration {
        let factor = self.factor.powi(attempt.saturating_sub(1) as i32);
        self.initial_delay.mul_f64(factor).min(self.max_delay)
    }
}

/// Wraps a [`Transport`] and re-attempts failed sends with backoff.
///
/// The element stays staged (and its capacity reserved) for the whole
/// retry sequence; only after the final failure does the worker release
/// and drop it.
pub struct RetryingTransport<T> {
    inner: T,
    config: RetryConfig,
}

impl<T: Transport> RetryingTransport<T> {
    pub fn new(inner: T, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl<T: Transport> Transport for RetryingTransport<T> {
    async fn send(&self, element: &SendElement) -> Result<(), TransportError> {
        let mut attempt = 0;
        loop {
            match self.inner.send(element).await {
                Ok(()) => return Ok(()),
                Err(error) if attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self.config.delay_for(attempt);
                    warn!(
                        attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "send failed, retrying"
                    );
                    sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
