//! Bounded-time readiness polling.
//!
//! Polls a set of HTTP checks at a fixed interval until all of them succeed
//! in the same attempt or the shared deadline passes. There is no backoff:
//! the dominant cost is model loading, not server contention.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::port::outbound::probe::{HealthCheck, Probe};

/// Default interval between attempts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Default deadline; large because model loading dominates start time.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1800);

/// Fixed-interval poller over a [`Probe`].
pub struct HealthPoller {
    probe: Arc<dyn Probe>,
    interval: Duration,
}

impl HealthPoller {
    pub fn new(probe: Arc<dyn Probe>, interval: Duration) -> Self {
        Self { probe, interval }
    }

    /// Wait until every check succeeds within one attempt.
    ///
    /// Within an attempt checks run in order and stop at the first failure.
    /// Returns the number of attempts made.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HealthTimeout`] when the deadline passes first. The
    /// error names the checks that were still failing.
    pub async fn await_healthy(&self, checks: &[HealthCheck], timeout: Duration) -> Result<u32> {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let pending = self.first_failing(checks).await;
            let Some(pending) = pending else {
                info!(
                    attempts,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Instance ready"
                );
                return Ok(attempts);
            };
            debug!(attempts, url = %checks[pending].url, "Not ready yet");

            if Instant::now() + self.interval >= deadline {
                return Err(Error::HealthTimeout {
                    attempts,
                    elapsed: started.elapsed(),
                    pending: checks[pending..]
                        .iter()
                        .map(|check| check.url.clone())
                        .collect(),
                });
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    async fn first_failing(&self, checks: &[HealthCheck]) -> Option<usize> {
        for (index, check) in checks.iter().enumerate() {
            if !self.probe.ready(check).await {
                return Some(index);
            }
        }
        None
    }
}
