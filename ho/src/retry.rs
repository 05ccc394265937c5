//! Exponential backoff for operations
//!
//! The coordinator never retries: an error outcome is delivered like any
//! other terminal outcome. Retry policy belongs to the operation's own
//! construction - decorate the operation with [`with_backoff`] *before*
//! connecting it, and the coordinator sees a single operation that happens
//! to try several times internally.

use std::future::Future;
use std::time::Duration;

use cachedtask::Outcome;
use rand::Rng;
use tracing::{debug, warn};

/// Exponential backoff policy
///
/// Delays double per attempt starting from `initial_delay_ms`; jitter adds
/// up to a quarter of the computed delay to spread out simultaneous
/// retries.
#[derive(Debug, Clone)]
pub struct Backoff {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt (milliseconds)
    pub initial_delay_ms: u64,
    /// Add random jitter to each delay
    pub jitter: bool,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 250,
            jitter: true,
        }
    }
}

impl Backoff {
    /// Delay to sleep after a failed `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.initial_delay_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
        let jitter = if self.jitter && base > 0 {
            rand::rng().random_range(0..=base / 4)
        } else {
            0
        };
        Duration::from_millis(base + jitter)
    }
}

/// Run `make_op` until it yields a non-error outcome or attempts run out
///
/// `Value` and `Empty` outcomes pass through untouched; each `Error` before
/// the final attempt triggers a backoff sleep and a fresh operation from
/// `make_op`. The future this returns is what you hand to
/// [`TaskCoordinator::connect`](crate::coordinator::TaskCoordinator::connect).
pub async fn with_backoff<T, F, Fut>(policy: Backoff, mut make_op: F) -> Outcome<T>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Outcome<T>> + Send,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match make_op().await {
            Outcome::Error(err) if attempt < max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "with_backoff: retrying after error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            outcome => {
                debug!(attempt, kind = outcome.kind(), "with_backoff: terminal outcome");
                return outcome;
            }
        }
    }
}
