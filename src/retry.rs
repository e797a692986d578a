//! Bounded retry with exponential backoff for model calls.
//!
//! Both segment enrichment and answer generation share the same retry shape:
//! transient failures are retried with a doubling, capped delay; permanent
//! failures are surfaced immediately.

use crate::error::{Result, SiktError};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy for outbound model calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Upper bound on the backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Build a policy from millisecond settings.
    pub fn from_millis(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(base_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    /// Backoff delay after a given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Outcome of a retried operation, carrying the attempt count.
#[derive(Debug)]
pub struct Retried<T> {
    pub value: T,
    pub attempts: u32,
}

/// Run an operation under the policy.
///
/// Only [`SiktError::Transient`] triggers another attempt; any other error
/// is returned on the spot. Backoff waits are cooperative (`tokio::time::sleep`)
/// and block only the calling task.
pub async fn with_backoff<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<Retried<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(Retried { value, attempts: attempt }),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "Transient failure on attempt {}/{}, retrying in {:?}: {}",
                    attempt, policy.max_attempts, delay, e
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                debug!("Giving up after {} attempt(s): {}", attempt, e);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::from_millis(5, 1, 4)
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy::from_millis(5, 500, 8000);
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(10), Duration::from_millis(8000));
    }

    #[tokio::test]
    async fn test_transient_retried_up_to_bound() {
        let calls = AtomicU32::new(0);
        let result: Result<Retried<()>> = with_backoff(&fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SiktError::Transient("rate limit".into())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_permanent_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<Retried<()>> = with_backoff(&fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SiktError::Permanent("content rejected".into())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient() {
        let calls = AtomicU32::new(0);
        let result = with_backoff(&fast_policy(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(SiktError::Transient("503".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result.value, 42);
        assert_eq!(result.attempts, 3);
    }
}
