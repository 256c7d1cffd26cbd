//! Fixed-delay retry wrapper for remote calls.
//!
//! Every error is treated as retryable: no backoff, no jitter, no
//! classification.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// `max_attempts` of 0 is treated as 1.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, Duration::from_secs(config.delay_s))
    }

    /// Run `op` until it succeeds or the attempts are used up, sleeping
    /// `delay` between attempts. Returns the last error untouched.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        max = self.max_attempts,
                        error = %e,
                        "remote call failed"
                    );
                    if attempt >= self.max_attempts {
                        return Err(e);
                    }
                }
            }
            attempt += 1;
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn flaky(failures: u32, calls: &Cell<u32>) -> Result<&'static str, String> {
        let n = calls.get() + 1;
        calls.set(n);
        if n <= failures {
            Err(format!("failure {n}"))
        } else {
            Ok("done")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_k_failures() {
        let policy = RetryPolicy::new(5, Duration::from_secs(2));
        let calls = &Cell::new(0);
        let start = tokio::time::Instant::now();

        let result = policy.run(|| async move { flaky(3, calls) }).await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.get(), 4);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(6) && elapsed < Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn always_failing_stops_at_max_and_returns_last_error() {
        let policy = RetryPolicy::new(5, Duration::from_secs(2));
        let calls = &Cell::new(0);
        let start = tokio::time::Instant::now();

        let result = policy.run(|| async move { flaky(u32::MAX, calls) }).await;

        assert_eq!(result.unwrap_err(), "failure 5");
        assert_eq!(calls.get(), 5);
        // no sleep after the final attempt
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(8) && elapsed < Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_does_not_sleep() {
        let policy = RetryPolicy::new(3, Duration::from_secs(2));
        let calls = &Cell::new(0);
        let start = tokio::time::Instant::now();

        policy.run(|| async move { flaky(0, calls) }).await.unwrap();

        assert_eq!(calls.get(), 1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn zero_attempts_still_runs_once() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.max_attempts, 1);
        let calls = &Cell::new(0);
        assert!(policy.run(|| async move { flaky(1, calls) }).await.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn from_config_uses_configured_values() {
        let policy = RetryPolicy::from_config(&RetryConfig {
            max_retries: 3,
            delay_s: 7,
        });
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_secs(7));
    }
}
